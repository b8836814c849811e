mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use procure_agents::{build_assistant, AssistantConfig, AssistantError, ProcurementAssistant};
use procure_observability::{AppMetrics, MetricsSnapshot};
use procure_storage::Store;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub use crate::rate_limit::IpRateLimiter;

const MAX_QUESTION_CHARS: usize = 2_000;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub assistant: AssistantConfig,
    pub api_key: String,
    pub bind: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            assistant: AssistantConfig::from_env(),
            api_key: env::var("PROCURE_API_KEY").unwrap_or_else(|_| "dev-procure-key".to_string()),
            bind: env::var("PROCURE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            rate_limit_window: Duration::from_secs(
                env::var("PROCURE_RATE_LIMIT_WINDOW_SECONDS")
                    .ok()
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60),
            ),
            rate_limit_max: env::var("PROCURE_RATE_LIMIT_MAX")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .unwrap_or(120),
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub assistant: Arc<ProcurementAssistant<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: IpRateLimiter,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    backend: &'static str,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    text: String,
}

pub async fn build_app(config: &ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let assistant = build_assistant(&config.assistant, metrics.clone()).await?;

    let state = ApiState {
        assistant: Arc::new(assistant),
        metrics,
        api_key: config.api_key.clone(),
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/ask", post(ask))
        .route("/v1/lexicon", get(lexicon))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(16 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        backend: state.assistant.store().backend_name(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn ask(State(state): State<ApiState>, Json(request): Json<AskRequest>) -> Response {
    let text = request.text.trim();
    if text.is_empty() || text.chars().count() > MAX_QUESTION_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "invalid_question",
                "message": format!("text must be 1..={MAX_QUESTION_CHARS} characters")
            })),
        )
            .into_response();
    }

    match state.assistant.answer(text).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(err) => assistant_error_response(&err),
    }
}

async fn lexicon(State(state): State<ApiState>) -> Response {
    match state.assistant.lexicon().await {
        Ok(lexicon) => (StatusCode::OK, Json(lexicon)).into_response(),
        Err(err) => assistant_error_response(&err),
    }
}

fn assistant_error_response(err: &AssistantError) -> Response {
    warn!(error = %err, "assistant request failed");
    let (status, code) = match err {
        AssistantError::Classifier(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "classifier_unavailable")
        }
        AssistantError::Lexicon(_) | AssistantError::Datastore(_) => {
            (StatusCode::BAD_GATEWAY, "datastore_unavailable")
        }
    };
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": err.to_string()
        })),
    )
        .into_response()
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if let Err(retry_after) = state.limiter.check(&ip) {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
        let seconds = retry_after.as_secs().max(1).to_string();
        if let Ok(value) = HeaderValue::from_str(&seconds) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .next()
                .unwrap_or("unknown")
                .trim()
                .to_string()
        })
        .unwrap_or_else(|| "local".to_string())
}

#[cfg(test)]
mod tests {
    use procure_ml::ClassifierError;

    use super::*;

    #[test]
    fn classifier_failures_map_to_503() {
        let err = AssistantError::Classifier(ClassifierError::Unavailable("offline".to_string()));
        assert_eq!(
            assistant_error_response(&err).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn store_failures_map_to_502() {
        let lexicon = AssistantError::Lexicon(anyhow::anyhow!("refused"));
        let query = AssistantError::Datastore(anyhow::anyhow!("reset"));
        assert_eq!(
            assistant_error_response(&lexicon).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            assistant_error_response(&query).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn forwarded_for_picks_first_hop() {
        let request = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_ip(&request), "203.0.113.7");

        let local = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(request_ip(&local), "local");
    }
}
