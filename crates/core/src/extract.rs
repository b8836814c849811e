use std::ops::Range;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{EntitySet, Lexicon, Quarter};
use crate::recognize::{EntityRecognizer, EntitySpan, SpanLabel};

/// Order in which lexicon candidates are tried. The first candidate found in
/// the user text wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrder {
    /// The order the datastore listed its distinct values in.
    #[default]
    Listing,
    /// Longest value first, then lexical order.
    LongestFirst,
}

impl MatchOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "listing" | "first" => Some(Self::Listing),
            "longest" | "longest_first" | "longest-first" => Some(Self::LongestFirst),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct EntityExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    match_order: MatchOrder,
    explicit_year: Regex,
}

impl EntityExtractor {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>, match_order: MatchOrder) -> Self {
        Self {
            recognizer,
            match_order,
            explicit_year: Regex::new(r"\b(20\d{2})\b").expect("valid year regex"),
        }
    }

    pub fn recognizer_name(&self) -> &'static str {
        self.recognizer.name()
    }

    pub fn extract(&self, text: &str, lexicon: &Lexicon) -> EntitySet {
        let lower = text.to_lowercase();
        let department = match_lexicon(&lower, &lexicon.departments, self.match_order);
        let item = match_lexicon(&lower, &lexicon.items, self.match_order);
        let acquisition_method =
            match_lexicon(&lower, &lexicon.acquisition_methods, self.match_order);

        // Organisation spans that sit on an item or method mention are that
        // mention, not a department ("White Board markers").
        let claimed = [item.as_deref(), acquisition_method.as_deref()]
            .into_iter()
            .flatten()
            .filter_map(|value| find_ignore_case(text, value))
            .collect::<Vec<_>>();
        let spans = self
            .recognizer
            .recognize(text)
            .into_iter()
            .filter(|span| {
                span.label != SpanLabel::Organization
                    || !claimed
                        .iter()
                        .any(|range| span.start < range.end && range.start < span.end)
            })
            .collect::<Vec<_>>();
        let mut entities = entities_from_spans(&spans);

        if let Some(year) = self
            .explicit_year
            .captures(text)
            .and_then(|captures| captures.get(1))
            .and_then(|found| found.as_str().parse::<i32>().ok())
        {
            entities.year = Some(year);
        }

        if let Some(quarter) = detect_quarter(text) {
            entities.quarter = Some(quarter);
        }

        if department.is_some() {
            entities.department = department;
        }
        entities.item = item;
        entities.acquisition_method = acquisition_method;

        entities
    }
}

/// Year from date spans that are exactly four digits, department from
/// organisation spans. Later spans overwrite earlier ones.
pub fn entities_from_spans(spans: &[EntitySpan]) -> EntitySet {
    let mut entities = EntitySet::default();

    for span in spans {
        match span.label {
            SpanLabel::Date => {
                if is_four_digits(&span.text) {
                    entities.year = span.text.parse().ok();
                }
            }
            SpanLabel::Organization => {
                let name = span.text.trim();
                if !name.is_empty() {
                    entities.department = Some(name.to_string());
                }
            }
        }
    }

    entities
}

/// First quarter in Q1..Q4 order whose marker appears, regardless of position.
pub fn detect_quarter(text: &str) -> Option<Quarter> {
    let lower = text.to_lowercase();
    Quarter::ALL.into_iter().find(|quarter| {
        text.contains(quarter.as_str()) || lower.contains(&format!("quarter {}", quarter.number()))
    })
}

pub fn match_lexicon(lower_text: &str, candidates: &[String], order: MatchOrder) -> Option<String> {
    let mut ordered = candidates.iter().collect::<Vec<_>>();
    if order == MatchOrder::LongestFirst {
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }

    ordered
        .into_iter()
        .filter(|candidate| !candidate.trim().is_empty())
        .find(|candidate| lower_text.contains(candidate.to_lowercase().as_str()))
        .cloned()
}

fn find_ignore_case(text: &str, value: &str) -> Option<Range<usize>> {
    Regex::new(&format!("(?i){}", regex::escape(value)))
        .ok()?
        .find(text)
        .map(|found| found.range())
}

fn is_four_digits(value: &str) -> bool {
    value.len() == 4 && value.bytes().all(|byte| byte.is_ascii_digit())
}
