use std::path::PathBuf;
use std::sync::Arc;

use procure_agents::{LexiconPolicy, ProcurementAssistant};
use procure_core::{EntityExtractor, MatchOrder, PatternRecognizer};
use procure_ml::RuleIntentClassifier;
use procure_observability::AppMetrics;
use procure_storage::{load_orders, PurchaseOrderRepository, Store};

fn seed_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/purchase_orders.jsonl")
}

async fn sqlite_assistant(match_order: MatchOrder) -> anyhow::Result<ProcurementAssistant<Store>> {
    let store = Store::sqlite("sqlite::memory:").await?;
    store.insert_orders(&load_orders(seed_path())?).await?;

    Ok(ProcurementAssistant::new(
        Arc::new(RuleIntentClassifier),
        EntityExtractor::new(Arc::new(PatternRecognizer::new()), match_order),
        Arc::new(store),
        LexiconPolicy::Live,
        AppMetrics::shared(),
    ))
}

#[tokio::test]
async fn sqlite_backend_answers_like_memory() {
    let assistant = sqlite_assistant(MatchOrder::Listing).await.unwrap();

    let spending = assistant
        .answer("How much did we spend on printers in 2022 Q3?")
        .await
        .unwrap();
    assert_eq!(spending.reply_text, "The total spending is $16,600.50.");

    let department = assistant
        .answer("What was the total amount for public health in 2021?")
        .await
        .unwrap();
    assert_eq!(department.entities.department.as_deref(), Some("Public Health"));
    assert_eq!(department.reply_text, "The total spending is $5,999.95.");

    let supplier = assistant
        .answer("who supplies toner cartridge orders")
        .await
        .unwrap();
    assert_eq!(
        supplier.reply_text,
        "The supplier for Toner Cartridge is Office Depot."
    );
}

#[tokio::test]
async fn importing_through_the_assistant_updates_answers() {
    let assistant = sqlite_assistant(MatchOrder::LongestFirst).await.unwrap();
    let before = assistant
        .answer("How many orders were placed in 2023?")
        .await
        .unwrap();
    assert_eq!(before.reply_text, "The total number of orders is 2.");

    let extra = procure_storage::parse_orders(
        r#"{"Department Name": "Motor Vehicles", "Item Name": "Desk Chair", "Acquisition Method": "Statewide Contract", "Supplier Name": "Steelcase", "Purchase Date": "2023-03-02", "Unit Price": 410.0, "Total Price": 820.0}"#,
    )
    .unwrap();
    assert_eq!(assistant.import_orders(&extra).await.unwrap(), 1);

    let after = assistant
        .answer("How many orders were placed in 2023?")
        .await
        .unwrap();
    assert_eq!(after.reply_text, "The total number of orders is 3.");

    let price = assistant
        .answer("What is the unit price of a desk chair?")
        .await
        .unwrap();
    assert_eq!(price.reply_text, "The unit price for Desk Chair is $410.00.");
}
