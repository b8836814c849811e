pub mod extract;
pub mod intent;
pub mod models;
pub mod recognize;
pub mod respond;
pub mod translate;

pub use extract::{EntityExtractor, MatchOrder};
pub use intent::{classify_intent_rules, normalize_text};
pub use models::*;
pub use recognize::{EntityRecognizer, EntitySpan, NoopRecognizer, PatternRecognizer, SpanLabel};
pub use respond::{compose_reply, format_money, format_reply, ReplyKind, NO_DATA, NOT_SURE};
pub use translate::{translate, TOP_ITEMS_LIMIT};
