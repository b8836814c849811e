//! Named-entity spans for the extractor.
//!
//! The extractor only cares about two span kinds: date-like mentions and
//! organisation-like mentions. `PatternRecognizer` finds both with regular
//! expressions; a statistical recognizer can be plugged in behind the same
//! trait.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanLabel {
    Date,
    Organization,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub text: String,
    pub label: SpanLabel,
    pub start: usize,
    pub end: usize,
}

impl EntitySpan {
    fn new(text: &str, label: SpanLabel, start: usize, end: usize) -> Self {
        Self {
            text: text.to_string(),
            label,
            start,
            end,
        }
    }

    fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &'static str;
    /// Spans sorted by start offset.
    fn recognize(&self, text: &str) -> Vec<EntitySpan>;
}

#[derive(Debug, Default)]
pub struct NoopRecognizer;

impl EntityRecognizer for NoopRecognizer {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn recognize(&self, _text: &str) -> Vec<EntitySpan> {
        Vec::new()
    }
}

const LEADING_STOPWORDS: &[&str] = &[
    "What", "Which", "How", "Who", "Did", "Does", "Do", "Is", "Was", "The", "Our", "In", "For",
    "Show", "Tell", "List", "Give",
];

#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    month_date: Regex,
    fiscal_year: Regex,
    quarter_year: Regex,
    relative_date: Regex,
    bare_year: Regex,
    organization: Regex,
}

impl Default for PatternRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRecognizer {
    pub fn new() -> Self {
        Self {
            month_date: Regex::new(
                r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?(?:\s+\d{1,2}(?:st|nd|rd|th)?,?)?\s+\d{4}\b",
            )
            .expect("valid month date regex"),
            fiscal_year: Regex::new(r"(?i)\b(?:fiscal\s+year\s+|fy\s?)(\d{4})\b")
                .expect("valid fiscal year regex"),
            quarter_year: Regex::new(r"\b(?:Q[1-4]|(?i:quarter\s+[1-4]))\s+(?:of\s+)?\d{4}\b")
                .expect("valid quarter year regex"),
            relative_date: Regex::new(
                r"(?i)\b(?:last|this|next|previous|current)\s+(?:fiscal\s+year|year|quarter|month)\b",
            )
            .expect("valid relative date regex"),
            bare_year: Regex::new(r"\b\d{4}\b").expect("valid bare year regex"),
            organization: Regex::new(
                r"\b(?:[A-Z][\w&'.-]*\s+)*(?:Department|Dept|Agency|Office|Board|Commission|Authority|University|College|Corporation|Corp|Inc|LLC|Bureau|Council)\b\.?(?:\s+(?:of|for)(?:\s+(?:the\s+)?[A-Z][\w&'-]*)+)?",
            )
            .expect("valid organization regex"),
        }
    }

    fn date_spans(&self, text: &str) -> Vec<EntitySpan> {
        let mut candidates = Vec::new();

        for regex in [&self.month_date, &self.quarter_year, &self.relative_date] {
            for found in regex.find_iter(text) {
                candidates.push(EntitySpan::new(
                    found.as_str(),
                    SpanLabel::Date,
                    found.start(),
                    found.end(),
                ));
            }
        }

        for captures in self.fiscal_year.captures_iter(text) {
            if let Some(year) = captures.get(1) {
                candidates.push(EntitySpan::new(
                    year.as_str(),
                    SpanLabel::Date,
                    year.start(),
                    year.end(),
                ));
            }
        }

        for found in self.bare_year.find_iter(text) {
            candidates.push(EntitySpan::new(
                found.as_str(),
                SpanLabel::Date,
                found.start(),
                found.end(),
            ));
        }

        candidates.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| (b.end - b.start).cmp(&(a.end - a.start)))
        });

        let mut kept: Vec<EntitySpan> = Vec::new();
        for candidate in candidates {
            if kept.iter().all(|span| !span.overlaps(&candidate)) {
                kept.push(candidate);
            }
        }
        kept
    }

    fn organization_spans(&self, text: &str) -> Vec<EntitySpan> {
        self.organization
            .find_iter(text)
            .filter_map(|found| {
                let (offset, trimmed) = strip_leading_stopwords(found.as_str());
                let trimmed = trimmed.trim_end();
                // A keyword on its own ("Office supplies") names nothing.
                if trimmed.is_empty() || !trimmed.contains(char::is_whitespace) {
                    return None;
                }
                let start = found.start() + offset;
                Some(EntitySpan::new(
                    trimmed,
                    SpanLabel::Organization,
                    start,
                    start + trimmed.len(),
                ))
            })
            .collect()
    }
}

impl EntityRecognizer for PatternRecognizer {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans = self.date_spans(text);
        spans.extend(self.organization_spans(text));
        spans.sort_by_key(|span| span.start);
        spans
    }
}

fn strip_leading_stopwords(input: &str) -> (usize, &str) {
    let mut offset = 0;
    let mut rest = input;

    loop {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..word_end];
        if word_end == rest.len() || !LEADING_STOPWORDS.contains(&word) {
            return (offset, rest);
        }

        let after = &rest[word_end..];
        let skipped = after.len() - after.trim_start().len();
        offset += word_end + skipped;
        rest = after.trim_start();
    }
}
