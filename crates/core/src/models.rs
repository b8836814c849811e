use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    TotalSpending,
    OrdersCount,
    FrequentItems,
    SupplierInformation,
    ItemPriceInformation,
    Unknown,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Self::TotalSpending,
        Self::OrdersCount,
        Self::FrequentItems,
        Self::SupplierInformation,
        Self::ItemPriceInformation,
        Self::Unknown,
    ];

    /// Parses a classifier label. Anything outside the closed set is `Unknown`.
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "total_spending" => Self::TotalSpending,
            "orders_count" => Self::OrdersCount,
            "frequent_items" => Self::FrequentItems,
            "supplier_information" => Self::SupplierInformation,
            "item_price_information" => Self::ItemPriceInformation,
            _ => Self::Unknown,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::TotalSpending => "total_spending",
            Self::OrdersCount => "orders_count",
            Self::FrequentItems => "frequent_items",
            Self::SupplierInformation => "supplier_information",
            Self::ItemPriceInformation => "item_price_information",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Self::Q1, Self::Q2, Self::Q3, Self::Q4];

    pub fn from_month(month: u32) -> Option<Self> {
        match month {
            1..=3 => Some(Self::Q1),
            4..=6 => Some(Self::Q2),
            7..=9 => Some(Self::Q3),
            10..=12 => Some(Self::Q4),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Q1 => 1,
            Self::Q2 => 2,
            Self::Q3 => 3,
            Self::Q4 => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
        }
    }
}

/// Slots the extractor can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitySlot {
    Year,
    Quarter,
    Department,
    Item,
    AcquisitionMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    pub year: Option<i32>,
    pub quarter: Option<Quarter>,
    pub department: Option<String>,
    pub item: Option<String>,
    pub acquisition_method: Option<String>,
}

impl EntitySet {
    pub fn filled_slots(&self) -> Vec<EntitySlot> {
        let mut slots = Vec::new();
        if self.year.is_some() {
            slots.push(EntitySlot::Year);
        }
        if self.quarter.is_some() {
            slots.push(EntitySlot::Quarter);
        }
        if self.department.is_some() {
            slots.push(EntitySlot::Department);
        }
        if self.item.is_some() {
            slots.push(EntitySlot::Item);
        }
        if self.acquisition_method.is_some() {
            slots.push(EntitySlot::AcquisitionMethod);
        }
        slots
    }
}

/// Known distinct values per matchable field, in the order the datastore listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    pub departments: Vec<String>,
    pub items: Vec<String>,
    pub acquisition_methods: Vec<String>,
}

impl Lexicon {
    /// Builds a lexicon, dropping blank entries.
    pub fn new(
        departments: Vec<String>,
        items: Vec<String>,
        acquisition_methods: Vec<String>,
    ) -> Self {
        Self {
            departments: non_blank(departments),
            items: non_blank(items),
            acquisition_methods: non_blank(acquisition_methods),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.departments.is_empty() && self.items.is_empty() && self.acquisition_methods.is_empty()
    }
}

fn non_blank(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect()
}

/// Datastore columns referenced by queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    DepartmentName,
    ItemName,
    AcquisitionMethod,
    SupplierName,
    PurchaseYear,
    PurchaseQuarter,
    UnitPrice,
    TotalPrice,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Self::DepartmentName => "department_name",
            Self::ItemName => "item_name",
            Self::AcquisitionMethod => "acquisition_method",
            Self::SupplierName => "supplier_name",
            Self::PurchaseYear => "purchase_year",
            Self::PurchaseQuarter => "purchase_quarter",
            Self::UnitPrice => "unit_price",
            Self::TotalPrice => "total_price",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Matcher {
    EqualsInt(i64),
    EqualsText(String),
    ContainsIgnoreCase(String),
}

impl Matcher {
    pub fn matches(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (Self::EqualsInt(expected), FieldValue::Integer(actual)) => expected == actual,
            (Self::EqualsInt(expected), FieldValue::Number(actual)) => {
                (*expected as f64 - actual).abs() < f64::EPSILON
            }
            (Self::EqualsText(expected), FieldValue::Text(actual)) => expected == actual,
            (Self::ContainsIgnoreCase(needle), FieldValue::Text(actual)) => actual
                .to_lowercase()
                .contains(needle.to_lowercase().as_str()),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub field: Field,
    pub matcher: Matcher,
}

/// Conjunction of field constraints. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Filter {
    pub constraints: Vec<Constraint>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, matcher: Matcher) -> Self {
        self.constraints.push(Constraint { field, matcher });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Text the filter constrains `field` with, if any.
    pub fn text_for(&self, field: Field) -> Option<&str> {
        self.constraints
            .iter()
            .find(|constraint| constraint.field == field)
            .and_then(|constraint| match &constraint.matcher {
                Matcher::EqualsText(value) | Matcher::ContainsIgnoreCase(value) => {
                    Some(value.as_str())
                }
                Matcher::EqualsInt(_) => None,
            })
    }

    pub fn matches(&self, order: &PurchaseOrder) -> bool {
        self.constraints.iter().all(|constraint| {
            order
                .value_of(constraint.field)
                .is_some_and(|value| constraint.matcher.matches(&value))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Sum { field: Field },
    Count,
    TopGroups { group_by: Field, limit: usize },
    FindOne { projection: Field },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuerySpec {
    pub filter: Filter,
    pub operation: Operation,
}

/// Translator output: a query to run, or a reply that needs no datastore call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Translation {
    Query(QuerySpec),
    MissingEntity { slot: EntitySlot },
    NotUnderstood,
}

impl Translation {
    pub fn query(&self) -> Option<&QuerySpec> {
        match self {
            Self::Query(spec) => Some(spec),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum QueryOutcome {
    Sum(Option<f64>),
    Count(u64),
    Groups(Vec<GroupCount>),
    Lookup(Option<FieldValue>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    #[serde(default, alias = "Purchase Order Number")]
    pub purchase_order_number: Option<String>,
    #[serde(alias = "Department Name")]
    pub department_name: String,
    #[serde(alias = "Item Name")]
    pub item_name: String,
    #[serde(default, alias = "Acquisition Method")]
    pub acquisition_method: String,
    #[serde(default, alias = "Supplier Name")]
    pub supplier_name: Option<String>,
    #[serde(default, alias = "Purchase Year")]
    pub purchase_year: Option<i32>,
    #[serde(default, alias = "Purchase Quarter")]
    pub purchase_quarter: Option<Quarter>,
    #[serde(default, alias = "Quantity")]
    pub quantity: Option<f64>,
    #[serde(default, alias = "Unit Price")]
    pub unit_price: Option<f64>,
    #[serde(default, alias = "Total Price")]
    pub total_price: Option<f64>,
    #[serde(default, alias = "Purchase Date")]
    pub purchase_date: Option<NaiveDate>,
}

impl PurchaseOrder {
    /// Fills year and quarter from the purchase date when the record lacks them.
    pub fn normalized(mut self) -> Self {
        if let Some(date) = self.purchase_date {
            if self.purchase_year.is_none() {
                self.purchase_year = Some(date.year());
            }
            if self.purchase_quarter.is_none() {
                self.purchase_quarter = Quarter::from_month(date.month());
            }
        }
        self
    }

    pub fn value_of(&self, field: Field) -> Option<FieldValue> {
        match field {
            Field::DepartmentName => Some(FieldValue::Text(self.department_name.clone())),
            Field::ItemName => Some(FieldValue::Text(self.item_name.clone())),
            Field::AcquisitionMethod => Some(FieldValue::Text(self.acquisition_method.clone())),
            Field::SupplierName => self.supplier_name.clone().map(FieldValue::Text),
            Field::PurchaseYear => self.purchase_year.map(|year| FieldValue::Integer(year as i64)),
            Field::PurchaseQuarter => self
                .purchase_quarter
                .map(|quarter| FieldValue::Text(quarter.as_str().to_string())),
            Field::UnitPrice => self.unit_price.map(FieldValue::Number),
            Field::TotalPrice => self.total_price.map(FieldValue::Number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_labels_parse_to_unknown() {
        assert_eq!(Intent::from_label("total_spending"), Intent::TotalSpending);
        assert_eq!(Intent::from_label(" Orders_Count "), Intent::OrdersCount);
        assert_eq!(Intent::from_label("greeting"), Intent::Unknown);
    }

    #[test]
    fn lexicon_drops_blank_values() {
        let lexicon = Lexicon::new(
            vec!["".to_string(), "Transportation".to_string()],
            vec!["  ".to_string()],
            Vec::new(),
        );
        assert_eq!(lexicon.departments, vec!["Transportation".to_string()]);
        assert!(lexicon.items.is_empty());
    }

    #[test]
    fn normalized_derives_year_and_quarter_from_date() {
        let order = PurchaseOrder {
            item_name: "Printer".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2021, 8, 14),
            ..PurchaseOrder::default()
        }
        .normalized();

        assert_eq!(order.purchase_year, Some(2021));
        assert_eq!(order.purchase_quarter, Some(Quarter::Q3));
    }

    #[test]
    fn filter_uses_partial_match_for_text_and_exact_for_year() {
        let order = PurchaseOrder {
            department_name: "Department of Transportation".to_string(),
            item_name: "Laser Printer".to_string(),
            purchase_year: Some(2022),
            ..PurchaseOrder::default()
        };

        let filter = Filter::all()
            .with(
                Field::DepartmentName,
                Matcher::ContainsIgnoreCase("transport".to_string()),
            )
            .with(Field::PurchaseYear, Matcher::EqualsInt(2022));
        assert!(filter.matches(&order));

        let other_year = Filter::all().with(Field::PurchaseYear, Matcher::EqualsInt(2021));
        assert!(!other_year.matches(&order));
    }

    #[test]
    fn missing_values_never_match() {
        let order = PurchaseOrder::default();
        let filter = Filter::all().with(Field::PurchaseQuarter, Matcher::EqualsText("Q1".into()));
        assert!(!filter.matches(&order));
    }

    #[test]
    fn parses_dataset_column_names() {
        let raw = r#"{"Department Name":"Corrections","Item Name":"Paper","Acquisition Method":"Statewide Contract","Supplier Name":"Office Depot","Purchase Year":2020,"Purchase Quarter":"Q2","Unit Price":4.5,"Total Price":90.0}"#;
        let order: PurchaseOrder = serde_json::from_str(raw).unwrap();
        assert_eq!(order.department_name, "Corrections");
        assert_eq!(order.purchase_quarter, Some(Quarter::Q2));
        assert_eq!(order.total_price, Some(90.0));
    }
}
