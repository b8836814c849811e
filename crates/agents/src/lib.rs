pub mod config;
pub mod executor;
pub mod lexicon;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use procure_core::{
    compose_reply, normalize_text, translate, EntityExtractor, EntitySet, Intent, Lexicon,
    PatternRecognizer, PurchaseOrder, QueryOutcome, ReplyKind, Translation,
};
use procure_ml::{ClassifierError, IntentClassifier, ProcureMlStack};
use procure_observability::AppMetrics;
use procure_storage::{load_orders, PurchaseOrderRepository, Store};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use config::AssistantConfig;
pub use lexicon::{LexiconPolicy, LexiconProvider};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("lexicon lookup failed: {0:#}")]
    Lexicon(anyhow::Error),
    #[error("datastore query failed: {0:#}")]
    Datastore(anyhow::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantReply {
    pub request_id: String,
    pub reply_text: String,
    pub intent: Intent,
    pub confidence: f32,
    pub model: &'static str,
    pub entities: EntitySet,
    pub translation: Translation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<QueryOutcome>,
}

pub struct ProcurementAssistant<S> {
    classifier: Arc<dyn IntentClassifier>,
    extractor: EntityExtractor,
    lexicon: LexiconProvider<S>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S> ProcurementAssistant<S>
where
    S: PurchaseOrderRepository,
{
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        extractor: EntityExtractor,
        store: Arc<S>,
        lexicon_policy: LexiconPolicy,
        metrics: Arc<AppMetrics>,
    ) -> Self {
        Self {
            classifier,
            extractor,
            lexicon: LexiconProvider::new(store.clone(), lexicon_policy),
            store,
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    #[instrument(skip(self, text), fields(chars = text.len()))]
    pub async fn answer(&self, text: &str) -> Result<AssistantReply, AssistantError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let result = self.answer_inner(text).await;
        self.metrics.observe_latency(started.elapsed());
        if let Err(err) = &result {
            self.metrics.inc_failure();
            warn!(error = %err, "query failed");
        }
        result
    }

    async fn answer_inner(&self, text: &str) -> Result<AssistantReply, AssistantError> {
        let request_id = Uuid::new_v4().to_string();
        let normalized = normalize_text(text);

        let prediction = self.classifier.predict(&normalized)?;
        self.metrics.inc_classifier_inference();

        let lexicon = self
            .lexicon
            .current()
            .await
            .map_err(AssistantError::Lexicon)?;
        let entities = self.extractor.extract(&normalized, &lexicon);
        let translation = translate(prediction.intent, &entities);

        let outcome = match translation.query() {
            Some(spec) => {
                self.metrics.inc_datastore_query();
                let outcome = executor::execute(self.store.as_ref(), spec)
                    .await
                    .map_err(AssistantError::Datastore)?;
                Some(outcome)
            }
            None => None,
        };

        let (reply_text, kind) = compose_reply(prediction.intent, &translation, outcome.as_ref());
        match kind {
            ReplyKind::Answer => {}
            ReplyKind::NoData => self.metrics.inc_no_data(),
            ReplyKind::Clarification => self.metrics.inc_clarification(),
            ReplyKind::Fallback => self.metrics.inc_fallback(),
        }

        info!(
            request_id = %request_id,
            intent = prediction.intent.as_label(),
            model = prediction.model,
            confidence = prediction.confidence,
            slots = ?entities.filled_slots(),
            reply = ?kind,
            "query answered"
        );

        Ok(AssistantReply {
            request_id,
            reply_text,
            intent: prediction.intent,
            confidence: prediction.confidence,
            model: prediction.model,
            entities,
            translation,
            outcome,
        })
    }

    pub async fn lexicon(&self) -> Result<Lexicon, AssistantError> {
        self.lexicon.current().await.map_err(AssistantError::Lexicon)
    }

    /// Stores `orders` and drops any cached lexicon.
    pub async fn import_orders(&self, orders: &[PurchaseOrder]) -> Result<u64, AssistantError> {
        let inserted = self
            .store
            .insert_orders(orders)
            .await
            .map_err(AssistantError::Datastore)?;
        self.lexicon.invalidate();
        info!(inserted, "purchase orders imported");
        Ok(inserted)
    }
}

/// Wires the store, classifier and extractor described by `config`.
pub async fn build_assistant(
    config: &AssistantConfig,
    metrics: Arc<AppMetrics>,
) -> anyhow::Result<ProcurementAssistant<Store>> {
    let store = Store::connect(config.database_url.as_deref())
        .await
        .context("failed to open purchase-order store")?;

    if let Some(seed_path) = &config.seed_path {
        let orders = load_orders(seed_path)?;
        let inserted = store.insert_orders(&orders).await?;
        info!(path = %seed_path.display(), inserted, "seeded purchase orders");
    }

    let ml_stack = ProcureMlStack::load(&config.intent_dataset);
    let extractor = EntityExtractor::new(Arc::new(PatternRecognizer::new()), config.match_order);

    info!(
        backend = store.backend_name(),
        burn_enabled = ml_stack.burn_enabled,
        recognizer = extractor.recognizer_name(),
        lexicon_policy = ?config.lexicon_policy,
        match_order = ?config.match_order,
        "procurement assistant ready"
    );

    Ok(ProcurementAssistant::new(
        ml_stack.classifier,
        extractor,
        Arc::new(store),
        config.lexicon_policy,
        metrics,
    ))
}
