//! Media Sentinel — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use media_sentinel::api::{self, AppState};
use media_sentinel::config::ScanConfig;
use media_sentinel::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("media_sentinel=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    // Collaborator handles are built once here and never reloaded.
    let cfg = ScanConfig::from_env();
    let metrics = Metrics::init(cfg.collaborators.len());
    let state = AppState::from_config(cfg);

    // One-off smoke test of the classification endpoints; logs, never fails.
    state.ensemble.quick_probe().await;

    let router = api::create_router(state).merge(metrics.router());

    let addr = std::env::var("SCAN_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "media-sentinel listening");
    axum::serve(listener, router).await?;
    Ok(())
}
