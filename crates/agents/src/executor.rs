use anyhow::Result;
use procure_core::{Operation, QueryOutcome, QuerySpec};
use procure_storage::PurchaseOrderRepository;

/// Runs one translated query against the datastore.
pub async fn execute<S>(store: &S, spec: &QuerySpec) -> Result<QueryOutcome>
where
    S: PurchaseOrderRepository,
{
    let outcome = match spec.operation {
        Operation::Sum { field } => QueryOutcome::Sum(store.sum(&spec.filter, field).await?),
        Operation::Count => QueryOutcome::Count(store.count(&spec.filter).await?),
        Operation::TopGroups { group_by, limit } => {
            QueryOutcome::Groups(store.group_count(&spec.filter, group_by, limit).await?)
        }
        Operation::FindOne { projection } => {
            QueryOutcome::Lookup(store.find_one(&spec.filter, projection).await?)
        }
    };
    Ok(outcome)
}
