use anyhow::Result;
use procure_api::{build_app, ApiConfig};
use procure_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("procure_api");

    let config = ApiConfig::from_env();
    let app = build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(bind = %config.bind, "procurement assistant api started");

    axum::serve(listener, app).await?;
    Ok(())
}
