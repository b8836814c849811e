use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::RwLock;
use procure_core::{Field, Lexicon};
use procure_storage::PurchaseOrderRepository;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexiconPolicy {
    /// Query distinct values on every request.
    Live,
    /// Reuse the last lexicon until it is older than `ttl`.
    Cached { ttl: Duration },
}

impl LexiconPolicy {
    /// A zero TTL means live lookups.
    pub fn from_ttl(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Self::Live
        } else {
            Self::Cached { ttl }
        }
    }
}

pub struct LexiconProvider<S> {
    store: Arc<S>,
    policy: LexiconPolicy,
    cached: RwLock<Option<(Instant, Lexicon)>>,
}

impl<S> LexiconProvider<S>
where
    S: PurchaseOrderRepository,
{
    pub fn new(store: Arc<S>, policy: LexiconPolicy) -> Self {
        Self {
            store,
            policy,
            cached: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Result<Lexicon> {
        let LexiconPolicy::Cached { ttl } = self.policy else {
            return self.fetch().await;
        };

        let fresh = self
            .cached
            .read()
            .as_ref()
            .filter(|(fetched_at, _)| fetched_at.elapsed() < ttl)
            .map(|(_, lexicon)| lexicon.clone());
        if let Some(lexicon) = fresh {
            return Ok(lexicon);
        }

        let lexicon = self.fetch().await?;
        *self.cached.write() = Some((Instant::now(), lexicon.clone()));
        Ok(lexicon)
    }

    /// Drops any cached lexicon so the next request sees fresh values.
    pub fn invalidate(&self) {
        self.cached.write().take();
    }

    async fn fetch(&self) -> Result<Lexicon> {
        let departments = self.store.distinct_values(Field::DepartmentName).await?;
        let items = self.store.distinct_values(Field::ItemName).await?;
        let methods = self.store.distinct_values(Field::AcquisitionMethod).await?;

        let lexicon = Lexicon::new(departments, items, methods);
        debug!(
            departments = lexicon.departments.len(),
            items = lexicon.items.len(),
            acquisition_methods = lexicon.acquisition_methods.len(),
            "lexicon fetched"
        );
        Ok(lexicon)
    }
}
