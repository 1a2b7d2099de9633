/// Ephem HTTP server binary
///
/// Serves the paste JSON API, the HTML view page, health and metrics.

use anyhow::Context;
use clap::Parser;
use ephem_server::{metrics, router, telemetry, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    telemetry::init(config.log_format);

    metrics::register_metrics();
    info!("Initialized Prometheus metrics");

    let pastes = config.build_pastes().context("failed to open paste store")?;
    match &config.data_dir {
        Some(dir) => info!(path = %dir.display(), sync = !config.no_sync, "Opened paste store"),
        None => warn!("No data directory configured; pastes are kept in memory only"),
    }
    if config.test_mode {
        warn!("Test mode enabled: x-test-now-ms header overrides the clock");
    }

    let state = AppState::new(pastes, config.http_settings());
    let flush_handle = state.pastes.clone();
    let app = router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Ephem server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    flush_handle.flush().context("failed to flush paste store")?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
