use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use procure_core::Intent;
use serde::Deserialize;
use tracing::debug;

use crate::fallback::normalize;
use crate::{ClassifierError, EmbeddingModel, IntentClassifier, IntentPrediction};

#[derive(Debug, Deserialize)]
struct LabeledExample {
    text: String,
    intent: String,
}

/// Nearest-centroid classifier over embedded training utterances.
#[derive(Clone)]
pub struct CentroidIntentClassifier {
    model_name: &'static str,
    centroids: Vec<(Intent, Vec<f32>)>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl CentroidIntentClassifier {
    /// Reads one `{"text": ..., "intent": ...}` object per line.
    pub fn from_jsonl(
        path: impl AsRef<Path>,
        embedder: Arc<dyn EmbeddingModel>,
        model_name: &'static str,
    ) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!(
                "failed reading intent training dataset at {}",
                path.as_ref().display()
            )
        })?;

        let mut examples = Vec::new();
        for (idx, line) in raw
            .lines()
            .map(str::trim)
            .enumerate()
            .filter(|(_, line)| !line.is_empty())
        {
            let example: LabeledExample = serde_json::from_str(line)
                .with_context(|| format!("invalid jsonl training line {}", idx + 1))?;
            examples.push((example.text, Intent::from_label(&example.intent)));
        }

        Self::train(&examples, embedder, model_name)
    }

    pub fn train(
        examples: &[(String, Intent)],
        embedder: Arc<dyn EmbeddingModel>,
        model_name: &'static str,
    ) -> Result<Self> {
        let mut by_intent: HashMap<Intent, Vec<Vec<f32>>> = HashMap::new();
        for (text, intent) in examples {
            by_intent
                .entry(*intent)
                .or_default()
                .push(embedder.embed(text));
        }

        let mut centroids = by_intent
            .into_iter()
            .filter(|(_, vectors)| !vectors.is_empty())
            .map(|(intent, vectors)| (intent, centroid(&vectors)))
            .collect::<Vec<_>>();
        centroids.sort_by_key(|(intent, _)| intent.as_label());

        if centroids.is_empty() {
            anyhow::bail!("training dataset produced zero intent centroids");
        }

        debug!(
            model = model_name,
            embedder = embedder.model_name(),
            intents = centroids.len(),
            examples = examples.len(),
            "centroid intent classifier trained"
        );

        Ok(Self {
            model_name,
            centroids,
            embedder,
        })
    }
}

impl IntentClassifier for CentroidIntentClassifier {
    fn predict(&self, text: &str) -> Result<IntentPrediction, ClassifierError> {
        let query = self.embedder.embed(text);
        let mut best_intent = Intent::Unknown;
        let mut best_score = -1.0_f32;

        for (intent, center) in &self.centroids {
            let score = cosine_similarity(&query, center);
            if score > best_score {
                best_score = score;
                best_intent = *intent;
            }
        }

        Ok(IntentPrediction {
            intent: best_intent,
            confidence: ((best_score + 1.0) / 2.0).clamp(0.0, 1.0),
            model: self.model_name,
        })
    }
}

fn centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    let dims = vectors.first().map(Vec::len).unwrap_or(0);
    let mut acc = vec![0.0_f32; dims];

    for vector in vectors {
        for (idx, value) in vector.iter().enumerate() {
            acc[idx] += value;
        }
    }

    for value in &mut acc {
        *value /= vectors.len() as f32;
    }
    normalize(&mut acc);
    acc
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut a_norm = 0.0;
    let mut b_norm = 0.0;
    for (lhs, rhs) in a.iter().zip(b.iter()) {
        dot += lhs * rhs;
        a_norm += lhs * lhs;
        b_norm += rhs * rhs;
    }

    if a_norm == 0.0 || b_norm == 0.0 {
        0.0
    } else {
        dot / (a_norm.sqrt() * b_norm.sqrt())
    }
}
