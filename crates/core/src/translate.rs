use crate::models::{
    EntitySet, EntitySlot, Field, Filter, Intent, Matcher, Operation, QuerySpec, Translation,
};

pub const TOP_ITEMS_LIMIT: usize = 5;

/// Maps an intent and its entities to a datastore query. Pure and total.
pub fn translate(intent: Intent, entities: &EntitySet) -> Translation {
    match intent {
        Intent::TotalSpending => {
            let mut filter = Filter::all();
            if let Some(department) = &entities.department {
                filter = filter.with(
                    Field::DepartmentName,
                    Matcher::ContainsIgnoreCase(department.clone()),
                );
            }
            filter = with_period(filter, entities);

            Translation::Query(QuerySpec {
                filter,
                operation: Operation::Sum {
                    field: Field::TotalPrice,
                },
            })
        }
        Intent::OrdersCount => Translation::Query(QuerySpec {
            filter: with_period(Filter::all(), entities),
            operation: Operation::Count,
        }),
        Intent::FrequentItems => Translation::Query(QuerySpec {
            filter: Filter::all(),
            operation: Operation::TopGroups {
                group_by: Field::ItemName,
                limit: TOP_ITEMS_LIMIT,
            },
        }),
        Intent::SupplierInformation => item_lookup(entities, Field::SupplierName),
        Intent::ItemPriceInformation => item_lookup(entities, Field::UnitPrice),
        Intent::Unknown => Translation::NotUnderstood,
    }
}

fn with_period(mut filter: Filter, entities: &EntitySet) -> Filter {
    if let Some(year) = entities.year {
        filter = filter.with(Field::PurchaseYear, Matcher::EqualsInt(year as i64));
    }
    if let Some(quarter) = entities.quarter {
        filter = filter.with(
            Field::PurchaseQuarter,
            Matcher::EqualsText(quarter.as_str().to_string()),
        );
    }
    filter
}

fn item_lookup(entities: &EntitySet, projection: Field) -> Translation {
    let Some(item) = &entities.item else {
        return Translation::MissingEntity {
            slot: EntitySlot::Item,
        };
    };

    Translation::Query(QuerySpec {
        filter: Filter::all().with(Field::ItemName, Matcher::ContainsIgnoreCase(item.clone())),
        operation: Operation::FindOne { projection },
    })
}
