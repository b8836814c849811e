use std::path::PathBuf;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use procure_agents::AssistantConfig;
use procure_api::{build_app, ApiConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-procure-key";

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data")
}

fn config() -> ApiConfig {
    ApiConfig {
        assistant: AssistantConfig {
            seed_path: Some(data_dir().join("purchase_orders.jsonl")),
            intent_dataset: data_dir().join("intent_training.jsonl"),
            ..AssistantConfig::default()
        },
        api_key: API_KEY.to_string(),
        bind: "127.0.0.1:0".to_string(),
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 120,
    }
}

async fn app() -> Router {
    build_app(&config()).await.expect("app should build")
}

fn ask_request(text: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/ask")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(json!({ "text": text }).to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let response = app()
        .await
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());

    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["backend"], "memory");
    assert!(parsed.get("metrics").is_some());
}

#[tokio::test]
async fn ask_requires_api_key() {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/ask")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "text": "How many orders were placed in 2021?" }).to_string(),
        ))
        .unwrap();

    let response = app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ask_returns_structured_payload() {
    let response = app()
        .await
        .oneshot(ask_request("How much did we spend on printers in 2022 Q3?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["reply_text"], "The total spending is $16,600.50.");
    assert_eq!(parsed["intent"], "total_spending");
    assert_eq!(parsed["entities"]["year"], 2022);
    assert_eq!(parsed["entities"]["quarter"], "Q3");
    assert_eq!(parsed["entities"]["item"], "Printer");
    assert_eq!(parsed["translation"]["kind"], "query");
    assert!(parsed["request_id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn answers_each_supported_question() {
    let app = app().await;
    let cases = [
        ("How many orders were placed in 2021?", "The total number of orders is 3."),
        (
            "What are the most ordered items?",
            "The most frequently ordered items are: Copy Paper (5 times), Laptop (2 times), Printer (2 times), Nitrile Gloves (1 times), Toner Cartridge (1 times).",
        ),
        ("Who is the supplier for laptops?", "The supplier for Laptop is Dell."),
        ("What is the price of a printer?", "The unit price for Printer is $1250.00."),
        ("Who is the supplier for staplers?", "Please specify an item."),
        ("How much did we spend in 2019?", "No data available for the specified query."),
        ("Office supplies spending in 2022?", "The total spending is $20,240.50."),
    ];

    for (question, expected) in cases {
        let response = app.clone().oneshot(ask_request(question)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{question}");
        let parsed = json_body(response).await;
        assert_eq!(parsed["reply_text"], expected, "{question}");
    }
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let response = app().await.oneshot(ask_request("   ")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lexicon_lists_known_values() {
    let request = Request::builder()
        .uri("/v1/lexicon")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();

    let response = app().await.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["departments"][0], "Transportation");
    assert_eq!(parsed["items"][0], "Printer");
    assert!(parsed["acquisition_methods"]
        .as_array()
        .unwrap()
        .iter()
        .any(|method| method == "Statewide Contract"));
}

#[tokio::test]
async fn rate_limit_applies_per_ip() {
    let app = build_app(&ApiConfig {
        rate_limit_max: 1,
        ..config()
    })
    .await
    .unwrap();

    let lexicon_from = |ip: &str| {
        Request::builder()
            .uri("/v1/lexicon")
            .header("x-api-key", API_KEY)
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(lexicon_from("198.51.100.4")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(lexicon_from("198.51.100.4")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().get("retry-after").is_some());

    let other = app.oneshot(lexicon_from("198.51.100.5")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}
