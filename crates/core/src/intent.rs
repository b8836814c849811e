use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

use crate::models::Intent;

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Keyword rules for the procurement intents. Checked most specific first:
/// supplier, price, frequent items, order count, spending.
pub fn classify_intent_rules(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let words = lower.unicode_words().collect::<HashSet<_>>();

    if contains_any(
        &lower,
        &["who supplies", "who sells", "supplied by", "who provides"],
    ) || has_any_word(&words, &["supplier", "suppliers", "vendor", "vendors"])
    {
        return Intent::SupplierInformation;
    }

    if contains_any(
        &lower,
        &[
            "price of",
            "unit price",
            "how much does",
            "how much is",
            "cost per",
            "cost of a",
            "cost of one",
        ],
    ) || has_any_word(&words, &["priced", "pricing"])
    {
        return Intent::ItemPriceInformation;
    }

    if contains_any(
        &lower,
        &[
            "most ordered",
            "most frequent",
            "most common",
            "most popular",
            "top items",
            "ordered most",
            "bought most",
            "most purchased",
        ],
    ) || has_any_word(&words, &["frequently", "popular"])
    {
        return Intent::FrequentItems;
    }

    if contains_any(
        &lower,
        &[
            "how many orders",
            "number of orders",
            "order count",
            "count of orders",
            "orders were placed",
            "how many purchase orders",
            "how many purchases",
        ],
    ) {
        return Intent::OrdersCount;
    }

    if contains_any(
        &lower,
        &["how much did", "total cost", "total amount", "amount spent"],
    ) || has_any_word(
        &words,
        &["spend", "spent", "spending", "expenditure", "expenditures", "expenses"],
    ) {
        return Intent::TotalSpending;
    }

    Intent::Unknown
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}

fn has_any_word(words: &HashSet<&str>, candidates: &[&str]) -> bool {
    candidates.iter().any(|candidate| words.contains(candidate))
}
