mod import;
mod memory;
mod sqlite;

use anyhow::Result;
use procure_core::{Field, FieldValue, Filter, GroupCount, PurchaseOrder};

pub use import::{load_orders, parse_orders};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Narrow query surface over the purchase-order collection.
///
/// Text constraints in a [`Filter`] are case-insensitive partial matches;
/// numeric and enum constraints are exact. Case folding is backend-specific:
/// [`MemoryStore`] folds full Unicode, while [`SqliteStore`] relies on SQLite's
/// built-in `lower()`, which folds ASCII letters only, so `"école"` matches
/// `"École"` in memory but not in SQLite.
pub trait PurchaseOrderRepository: Send + Sync {
    /// Distinct non-blank values of `field`, in the store's listing order.
    async fn distinct_values(&self, field: Field) -> Result<Vec<String>>;
    /// `None` when no matching record carries a value for `field`.
    async fn sum(&self, filter: &Filter, field: Field) -> Result<Option<f64>>;
    /// Record counts per value of `group_by`, largest first, ties by key.
    async fn group_count(
        &self,
        filter: &Filter,
        group_by: Field,
        limit: usize,
    ) -> Result<Vec<GroupCount>>;
    async fn count(&self, filter: &Filter) -> Result<u64>;
    /// `projection` of the first matching record.
    async fn find_one(&self, filter: &Filter, projection: Field) -> Result<Option<FieldValue>>;
    async fn insert_orders(&self, orders: &[PurchaseOrder]) -> Result<u64>;
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        match database_url {
            Some(url) => Self::sqlite(url).await,
            None => Ok(Self::memory()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl PurchaseOrderRepository for Store {
    async fn distinct_values(&self, field: Field) -> Result<Vec<String>> {
        match self {
            Store::Memory(store) => store.distinct_values(field).await,
            Store::Sqlite(store) => store.distinct_values(field).await,
        }
    }

    async fn sum(&self, filter: &Filter, field: Field) -> Result<Option<f64>> {
        match self {
            Store::Memory(store) => store.sum(filter, field).await,
            Store::Sqlite(store) => store.sum(filter, field).await,
        }
    }

    async fn group_count(
        &self,
        filter: &Filter,
        group_by: Field,
        limit: usize,
    ) -> Result<Vec<GroupCount>> {
        match self {
            Store::Memory(store) => store.group_count(filter, group_by, limit).await,
            Store::Sqlite(store) => store.group_count(filter, group_by, limit).await,
        }
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        match self {
            Store::Memory(store) => store.count(filter).await,
            Store::Sqlite(store) => store.count(filter).await,
        }
    }

    async fn find_one(&self, filter: &Filter, projection: Field) -> Result<Option<FieldValue>> {
        match self {
            Store::Memory(store) => store.find_one(filter, projection).await,
            Store::Sqlite(store) => store.find_one(filter, projection).await,
        }
    }

    async fn insert_orders(&self, orders: &[PurchaseOrder]) -> Result<u64> {
        match self {
            Store::Memory(store) => store.insert_orders(orders).await,
            Store::Sqlite(store) => store.insert_orders(orders).await,
        }
    }
}
