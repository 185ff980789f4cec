//! F1 Telemetry Analyzer Server
//!
//! REST API for uploading lap telemetry and analyzing laps

use anyhow::{Context, Result};
use fta_server::{api, config::ServerConfig, state};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting F1 Telemetry Analyzer Server");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    let addr = config.listen_addr;
    let demo_laps = config.demo_laps;

    // Create application state
    let state = state::AppState::new(config).context("Invalid analysis configuration")?;
    info!(
        "Lap time predictions from {:?}",
        state.analyzer.predictor().source()
    );

    if demo_laps > 0 {
        let summary = state
            .seed_demo(demo_laps)
            .await
            .context("Failed to generate demo laps")?;
        info!(
            "Seeded {} demo laps ({} data points)",
            summary.lap_numbers.len(),
            summary.data_points_stored
        );
    }

    // Build the router
    let app = api::create_router(state);

    // Start server
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
