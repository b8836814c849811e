use std::env;
use std::path::PathBuf;
use std::time::Duration;

use procure_core::MatchOrder;

use crate::lexicon::LexiconPolicy;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// SQLite URL; `None` keeps everything in memory.
    pub database_url: Option<String>,
    /// Purchase orders loaded into the store at start-up.
    pub seed_path: Option<PathBuf>,
    pub intent_dataset: PathBuf,
    pub lexicon_policy: LexiconPolicy,
    pub match_order: MatchOrder,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            seed_path: None,
            intent_dataset: PathBuf::from("data/intent_training.jsonl"),
            lexicon_policy: LexiconPolicy::Live,
            match_order: MatchOrder::Listing,
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let lexicon_ttl = env::var("PROCURE_LEXICON_TTL_SECONDS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(0);

        Self {
            database_url: non_empty_var("PROCURE_DATABASE_URL"),
            seed_path: non_empty_var("PROCURE_SEED_PATH").map(PathBuf::from),
            intent_dataset: non_empty_var("PROCURE_INTENT_DATASET")
                .map(PathBuf::from)
                .unwrap_or(defaults.intent_dataset),
            lexicon_policy: LexiconPolicy::from_ttl(Duration::from_secs(lexicon_ttl)),
            match_order: env::var("PROCURE_LEXICON_MATCH")
                .ok()
                .and_then(|value| MatchOrder::parse(&value))
                .unwrap_or(defaults.match_order),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
