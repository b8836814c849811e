use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use procure_core::{Field, FieldValue, Filter, GroupCount, PurchaseOrder};

use crate::PurchaseOrderRepository;

#[derive(Clone, Default)]
pub struct MemoryStore {
    orders: Arc<RwLock<Vec<PurchaseOrder>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<PurchaseOrder>) -> Self {
        Self {
            orders: Arc::new(RwLock::new(
                orders.into_iter().map(PurchaseOrder::normalized).collect(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.orders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.read().is_empty()
    }
}

impl PurchaseOrderRepository for MemoryStore {
    async fn distinct_values(&self, field: Field) -> Result<Vec<String>> {
        let orders = self.orders.read();
        let mut seen = HashSet::new();
        let mut values = Vec::new();

        for value in orders
            .iter()
            .filter_map(|order| order.value_of(field))
            .filter_map(|value| value.as_text().map(str::to_string))
        {
            if !value.trim().is_empty() && seen.insert(value.clone()) {
                values.push(value);
            }
        }

        Ok(values)
    }

    async fn sum(&self, filter: &Filter, field: Field) -> Result<Option<f64>> {
        let total = self
            .orders
            .read()
            .iter()
            .filter(|order| filter.matches(order))
            .filter_map(|order| order.value_of(field).and_then(|value| value.as_f64()))
            .fold(None, |acc: Option<f64>, value| Some(acc.unwrap_or(0.0) + value));

        Ok(total)
    }

    async fn group_count(
        &self,
        filter: &Filter,
        group_by: Field,
        limit: usize,
    ) -> Result<Vec<GroupCount>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for order in self.orders.read().iter().filter(|order| filter.matches(order)) {
            if let Some(FieldValue::Text(key)) = order.value_of(group_by) {
                *counts.entry(key).or_default() += 1;
            }
        }

        let mut groups = counts
            .into_iter()
            .map(|(key, count)| GroupCount { key, count })
            .collect::<Vec<_>>();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        groups.truncate(limit);

        Ok(groups)
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        let count = self
            .orders
            .read()
            .iter()
            .filter(|order| filter.matches(order))
            .count();
        Ok(count as u64)
    }

    async fn find_one(&self, filter: &Filter, projection: Field) -> Result<Option<FieldValue>> {
        Ok(self
            .orders
            .read()
            .iter()
            .find(|order| filter.matches(order))
            .and_then(|order| order.value_of(projection)))
    }

    async fn insert_orders(&self, orders: &[PurchaseOrder]) -> Result<u64> {
        let mut guard = self.orders.write();
        guard.extend(orders.iter().cloned().map(PurchaseOrder::normalized));
        Ok(orders.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use procure_core::{Matcher, Quarter};

    use super::*;
    use crate::fixtures::orders;

    fn store() -> MemoryStore {
        MemoryStore::with_orders(orders())
    }

    #[tokio::test]
    async fn distinct_values_keep_first_seen_order() {
        let departments = store().distinct_values(Field::DepartmentName).await.unwrap();
        assert_eq!(
            departments,
            vec!["Transportation", "Corrections", "Water Resources"]
        );
    }

    #[tokio::test]
    async fn sums_with_partial_department_match() {
        let filter = Filter::all()
            .with(
                Field::DepartmentName,
                Matcher::ContainsIgnoreCase("TRANSPORT".to_string()),
            )
            .with(Field::PurchaseYear, Matcher::EqualsInt(2022));
        let total = store().sum(&filter, Field::TotalPrice).await.unwrap();
        assert_eq!(total, Some(10500.5));
    }

    #[tokio::test]
    async fn sum_over_nothing_is_none() {
        let filter = Filter::all().with(Field::PurchaseYear, Matcher::EqualsInt(1990));
        assert_eq!(store().sum(&filter, Field::TotalPrice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn counts_by_year_and_quarter() {
        let filter = Filter::all()
            .with(Field::PurchaseYear, Matcher::EqualsInt(2021))
            .with(
                Field::PurchaseQuarter,
                Matcher::EqualsText(Quarter::Q4.as_str().to_string()),
            );
        assert_eq!(store().count(&filter).await.unwrap(), 2);
        assert_eq!(store().count(&Filter::all()).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn groups_sorted_by_count_then_key() {
        let groups = store()
            .group_count(&Filter::all(), Field::ItemName, 2)
            .await
            .unwrap();
        assert_eq!(
            groups,
            vec![
                GroupCount {
                    key: "Paper".to_string(),
                    count: 3
                },
                GroupCount {
                    key: "Printer".to_string(),
                    count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn find_one_projects_a_single_field() {
        let filter =
            Filter::all().with(Field::ItemName, Matcher::ContainsIgnoreCase("lap".to_string()));
        assert_eq!(
            store().find_one(&filter, Field::SupplierName).await.unwrap(),
            Some(FieldValue::Text("Dell".to_string()))
        );
        assert_eq!(
            store().find_one(&filter, Field::UnitPrice).await.unwrap(),
            Some(FieldValue::Number(1200.0))
        );

        let missing =
            Filter::all().with(Field::ItemName, Matcher::ContainsIgnoreCase("desk".to_string()));
        assert_eq!(store().find_one(&missing, Field::UnitPrice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn partial_matches_fold_unicode_case() {
        let store = MemoryStore::with_orders(vec![crate::fixtures::order(
            "École Services",
            "Paper",
            "Staples",
            2022,
            Quarter::Q1,
            5.0,
            50.0,
        )]);
        let filter = Filter::all().with(
            Field::DepartmentName,
            Matcher::ContainsIgnoreCase("école".to_string()),
        );
        assert_eq!(store.count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn inserted_orders_are_normalized() {
        let store = MemoryStore::new();
        let order = PurchaseOrder {
            item_name: "Stapler".to_string(),
            purchase_date: chrono::NaiveDate::from_ymd_opt(2023, 11, 2),
            ..PurchaseOrder::default()
        };
        assert_eq!(store.insert_orders(&[order]).await.unwrap(), 1);

        let filter = Filter::all().with(
            Field::PurchaseQuarter,
            Matcher::EqualsText("Q4".to_string()),
        );
        assert_eq!(store.count(&filter).await.unwrap(), 1);
    }
}
