use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use procure_core::PurchaseOrder;
use tracing::info;

/// Reads purchase orders from a JSON array or a JSON-lines file.
pub fn load_orders(path: impl AsRef<Path>) -> Result<Vec<PurchaseOrder>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading purchase orders from {}", path.display()))?;

    let orders = parse_orders(&raw)
        .with_context(|| format!("failed parsing purchase orders in {}", path.display()))?;
    info!(path = %path.display(), orders = orders.len(), "purchase orders loaded");
    Ok(orders)
}

pub fn parse_orders(raw: &str) -> Result<Vec<PurchaseOrder>> {
    let trimmed = raw.trim_start();
    let orders = if trimmed.starts_with('[') {
        serde_json::from_str::<Vec<PurchaseOrder>>(trimmed).context("invalid json array")?
    } else {
        let mut orders = Vec::new();
        for (idx, line) in raw.lines().map(str::trim).enumerate() {
            if line.is_empty() {
                continue;
            }
            let order: PurchaseOrder = serde_json::from_str(line)
                .with_context(|| format!("invalid jsonl record on line {}", idx + 1))?;
            orders.push(order);
        }
        orders
    };

    Ok(orders.into_iter().map(PurchaseOrder::normalized).collect())
}
