use burn::tensor::{Tensor, TensorData};
use burn_ndarray::{NdArray, NdArrayDevice};
use procure_core::Intent;

use crate::fallback::normalize;
use crate::{ClassifierError, EmbeddingModel, IntentClassifier, IntentPrediction};

type Backend = NdArray<f32>;

#[derive(Debug, Clone)]
pub struct BurnHashEmbeddingModel {
    dims: usize,
}

impl BurnHashEmbeddingModel {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(32) }
    }
}

impl EmbeddingModel for BurnHashEmbeddingModel {
    fn model_name(&self) -> &'static str {
        "burn-hash-embed-v1"
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0_f32; self.dims];

        for token in text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let hash = rolling_hash(token.to_lowercase().as_bytes());
            let index = (hash as usize) % self.dims;
            let value = (((hash >> 8) & 0xF) as f32 / 8.0) - 1.0;
            vec[index] += value;
        }

        normalize(&mut vec);
        vec
    }
}

/// Scores a question against keyword centroids with one `[intents, dims]`
/// by `[dims, 1]` matmul. Vectors are unit length, so scores are cosines.
#[derive(Debug, Clone)]
pub struct BurnKeywordIntentClassifier {
    embedder: BurnHashEmbeddingModel,
    intents: Vec<Intent>,
    centroids: Vec<f32>,
}

impl BurnKeywordIntentClassifier {
    pub fn new(dims: usize) -> Self {
        let embedder = BurnHashEmbeddingModel::new(dims);
        let seeds = [
            (
                Intent::TotalSpending,
                "total spend spent spending expenditure budget cost amount",
            ),
            (
                Intent::OrdersCount,
                "how many orders number count purchase orders placed",
            ),
            (
                Intent::FrequentItems,
                "most ordered frequent popular common top items bought",
            ),
            (
                Intent::SupplierInformation,
                "supplier vendor supplies sells provides who",
            ),
            (
                Intent::ItemPriceInformation,
                "price unit cost each how much does priced",
            ),
        ];

        let intents = seeds.iter().map(|(intent, _)| *intent).collect();
        let centroids = seeds
            .iter()
            .flat_map(|(_, words)| embedder.embed(words))
            .collect();

        Self {
            embedder,
            intents,
            centroids,
        }
    }

    fn scores(&self, query: Vec<f32>) -> Result<Vec<f32>, ClassifierError> {
        let device = NdArrayDevice::Cpu;
        let dims = query.len();

        let centers = Tensor::<Backend, 2>::from_data(
            TensorData::new(self.centroids.clone(), [self.intents.len(), dims]),
            &device,
        );
        let query = Tensor::<Backend, 2>::from_data(TensorData::new(query, [dims, 1]), &device);

        centers
            .matmul(query)
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| ClassifierError::Inference(format!("{err:?}")))
    }
}

impl IntentClassifier for BurnKeywordIntentClassifier {
    fn predict(&self, text: &str) -> Result<IntentPrediction, ClassifierError> {
        let scores = self.scores(self.embedder.embed(text))?;

        let (intent, score) = self
            .intents
            .iter()
            .zip(scores)
            .fold((Intent::Unknown, -1.0_f32), |best, (intent, score)| {
                if score > best.1 {
                    (*intent, score)
                } else {
                    best
                }
            });

        Ok(IntentPrediction {
            intent,
            confidence: ((score + 1.0) / 2.0).clamp(0.0, 1.0),
            model: "burn-keyword-intent-v1",
        })
    }
}

fn rolling_hash(bytes: &[u8]) -> u64 {
    let mut hash = 0_u64;
    for byte in bytes {
        hash = hash.wrapping_mul(131).wrapping_add(*byte as u64);
    }
    hash
}
