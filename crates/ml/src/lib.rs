mod centroid;
mod fallback;

#[cfg(feature = "burn-ml")]
mod burn_impl;

use std::path::Path;
use std::sync::Arc;

use procure_core::{classify_intent_rules, Intent};
use thiserror::Error;
use tracing::warn;

pub use centroid::CentroidIntentClassifier;
pub use fallback::HashEmbeddingModel;

const MODEL_CONFIDENCE_FLOOR: f32 = 0.55;
const RULES_CONFIDENCE: f32 = 0.62;

pub trait EmbeddingModel: Send + Sync {
    fn model_name(&self) -> &'static str;
    fn embed(&self, text: &str) -> Vec<f32>;
}

#[derive(Debug, Clone)]
pub struct IntentPrediction {
    pub intent: Intent,
    pub confidence: f32,
    pub model: &'static str,
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("intent classifier unavailable: {0}")]
    Unavailable(String),
    #[error("intent classifier failed on input: {0}")]
    Inference(String),
}

pub trait IntentClassifier: Send + Sync {
    fn predict(&self, text: &str) -> Result<IntentPrediction, ClassifierError>;
}

#[derive(Debug, Default)]
pub struct RuleIntentClassifier;

impl IntentClassifier for RuleIntentClassifier {
    fn predict(&self, text: &str) -> Result<IntentPrediction, ClassifierError> {
        Ok(IntentPrediction {
            intent: classify_intent_rules(text),
            confidence: RULES_CONFIDENCE,
            model: "rules",
        })
    }
}

/// Keyword rules first; the model is consulted only when the rules find
/// nothing, and trusted only above a confidence floor.
#[derive(Clone)]
pub struct HybridIntentClassifier {
    model: Arc<dyn IntentClassifier>,
}

impl HybridIntentClassifier {
    pub fn new(model: Arc<dyn IntentClassifier>) -> Self {
        Self { model }
    }
}

impl IntentClassifier for HybridIntentClassifier {
    fn predict(&self, text: &str) -> Result<IntentPrediction, ClassifierError> {
        let rule_intent = classify_intent_rules(text);
        if rule_intent != Intent::Unknown {
            return Ok(IntentPrediction {
                intent: rule_intent,
                confidence: RULES_CONFIDENCE,
                model: "rules",
            });
        }

        let prediction = self.model.predict(text)?;
        if prediction.confidence > MODEL_CONFIDENCE_FLOOR {
            Ok(prediction)
        } else {
            Ok(IntentPrediction {
                intent: Intent::Unknown,
                ..prediction
            })
        }
    }
}

#[derive(Clone)]
pub struct ProcureMlStack {
    pub classifier: Arc<dyn IntentClassifier>,
    pub burn_enabled: bool,
}

impl ProcureMlStack {
    /// Trains a centroid classifier from `dataset_path` when the file exists,
    /// otherwise falls back to keyword rules. Either way rules take precedence.
    pub fn load(dataset_path: impl AsRef<Path>) -> Self {
        let dataset_path = dataset_path.as_ref();

        #[cfg(feature = "burn-ml")]
        {
            let embedder = Arc::new(burn_impl::BurnHashEmbeddingModel::new(192));
            let model: Arc<dyn IntentClassifier> = if dataset_path.exists() {
                CentroidIntentClassifier::from_jsonl(
                    dataset_path,
                    embedder,
                    "burn-centroid-intent",
                )
                .map(|clf| Arc::new(clf) as Arc<dyn IntentClassifier>)
                .unwrap_or_else(|err| {
                    warn!(error = %err, "intent dataset unusable, using burn keyword classifier");
                    Arc::new(burn_impl::BurnKeywordIntentClassifier::new(192))
                })
            } else {
                Arc::new(burn_impl::BurnKeywordIntentClassifier::new(192))
            };
            return Self {
                classifier: Arc::new(HybridIntentClassifier::new(model)),
                burn_enabled: true,
            };
        }

        #[cfg(not(feature = "burn-ml"))]
        {
            let embedder = Arc::new(HashEmbeddingModel::new(192));
            let classifier: Arc<dyn IntentClassifier> = if dataset_path.exists() {
                CentroidIntentClassifier::from_jsonl(
                    dataset_path,
                    embedder,
                    "fallback-centroid-intent",
                )
                .map(|clf| {
                    Arc::new(HybridIntentClassifier::new(Arc::new(clf))) as Arc<dyn IntentClassifier>
                })
                .unwrap_or_else(|err| {
                    warn!(error = %err, "intent dataset unusable, using keyword rules");
                    Arc::new(RuleIntentClassifier)
                })
            } else {
                Arc::new(RuleIntentClassifier)
            };
            Self {
                classifier,
                burn_enabled: false,
            }
        }
    }
}
