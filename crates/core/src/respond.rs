use crate::models::{
    EntitySlot, Field, FieldValue, GroupCount, Intent, QueryOutcome, Translation,
};

pub const NO_DATA: &str = "No data available for the specified query.";
pub const NOT_SURE: &str = "I'm not sure how to answer that.";

/// How a reply was produced, for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Answer,
    NoData,
    Clarification,
    Fallback,
}

pub fn format_reply(
    intent: Intent,
    translation: &Translation,
    outcome: Option<&QueryOutcome>,
) -> String {
    compose_reply(intent, translation, outcome).0
}

pub fn compose_reply(
    intent: Intent,
    translation: &Translation,
    outcome: Option<&QueryOutcome>,
) -> (String, ReplyKind) {
    let spec = match translation {
        Translation::Query(spec) => spec,
        Translation::MissingEntity { slot } => {
            return (missing_entity_prompt(*slot), ReplyKind::Clarification)
        }
        Translation::NotUnderstood => return (NOT_SURE.to_string(), ReplyKind::Fallback),
    };
    let item = spec.filter.text_for(Field::ItemName).unwrap_or_default();

    match (intent, outcome) {
        (Intent::TotalSpending, Some(QueryOutcome::Sum(total))) => match total {
            Some(total) if *total != 0.0 => (
                format!("The total spending is {}.", format_money(*total)),
                ReplyKind::Answer,
            ),
            _ => (NO_DATA.to_string(), ReplyKind::NoData),
        },
        (Intent::OrdersCount, Some(QueryOutcome::Count(count))) => (
            format!("The total number of orders is {count}."),
            ReplyKind::Answer,
        ),
        (Intent::FrequentItems, Some(QueryOutcome::Groups(groups))) => {
            if groups.is_empty() {
                (NO_DATA.to_string(), ReplyKind::NoData)
            } else {
                (
                    format!(
                        "The most frequently ordered items are: {}.",
                        describe_groups(groups)
                    ),
                    ReplyKind::Answer,
                )
            }
        }
        (Intent::SupplierInformation, Some(QueryOutcome::Lookup(value))) => {
            match value.as_ref().and_then(lookup_text) {
                Some(supplier) => (
                    format!("The supplier for {item} is {supplier}."),
                    ReplyKind::Answer,
                ),
                None => (
                    format!("No supplier information found for {item}."),
                    ReplyKind::NoData,
                ),
            }
        }
        (Intent::ItemPriceInformation, Some(QueryOutcome::Lookup(value))) => {
            match value.as_ref().and_then(FieldValue::as_f64) {
                Some(price) => (
                    format!("The unit price for {item} is ${price:.2}."),
                    ReplyKind::Answer,
                ),
                None => (
                    format!("No pricing information found for {item}."),
                    ReplyKind::NoData,
                ),
            }
        }
        _ => (NOT_SURE.to_string(), ReplyKind::Fallback),
    }
}

pub fn missing_entity_prompt(slot: EntitySlot) -> String {
    let noun = match slot {
        EntitySlot::Year => "a year",
        EntitySlot::Quarter => "a quarter",
        EntitySlot::Department => "a department",
        EntitySlot::Item => "an item",
        EntitySlot::AcquisitionMethod => "an acquisition method",
    };
    format!("Please specify {noun}.")
}

/// `$1,234,567.89`. Negative amounts keep the sign after the currency symbol.
pub fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, digit) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("${sign}{grouped}.{cents}")
}

fn describe_groups(groups: &[GroupCount]) -> String {
    groups
        .iter()
        .map(|group| format!("{} ({} times)", group.key, group.count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn lookup_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(text) if !text.trim().is_empty() => Some(text.clone()),
        FieldValue::Text(_) => None,
        FieldValue::Integer(number) => Some(number.to_string()),
        FieldValue::Number(number) => Some(number.to_string()),
    }
}
