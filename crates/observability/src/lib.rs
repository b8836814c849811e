use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    classifier_inference_total: AtomicU64,
    datastore_queries_total: AtomicU64,
    no_data_total: AtomicU64,
    clarification_total: AtomicU64,
    fallback_total: AtomicU64,
    failures_total: AtomicU64,
    total_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub classifier_inference_total: u64,
    pub datastore_queries_total: u64,
    pub no_data_total: u64,
    pub clarification_total: u64,
    pub fallback_total: u64,
    pub failures_total: u64,
    pub avg_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_requests_total").increment(1);
    }

    pub fn inc_classifier_inference(&self) {
        self.classifier_inference_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_classifier_inference_total").increment(1);
    }

    pub fn inc_datastore_query(&self) {
        self.datastore_queries_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_datastore_queries_total").increment(1);
    }

    pub fn inc_no_data(&self) {
        self.no_data_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_no_data_total").increment(1);
    }

    pub fn inc_clarification(&self) {
        self.clarification_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_clarification_total").increment(1);
    }

    pub fn inc_fallback(&self) {
        self.fallback_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_fallback_total").increment(1);
    }

    pub fn inc_failure(&self) {
        self.failures_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("procure_failures_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("procure_request_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            classifier_inference_total: self.classifier_inference_total.load(Ordering::Relaxed),
            datastore_queries_total: self.datastore_queries_total.load(Ordering::Relaxed),
            no_data_total: self.no_data_total.load(Ordering::Relaxed),
            clarification_total: self.clarification_total.load(Ordering::Relaxed),
            fallback_total: self.fallback_total.load(Ordering::Relaxed),
            failures_total: self.failures_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,procure_api=info,procure_agents=info,procure_storage=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
