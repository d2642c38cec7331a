// =============================================================================
// BTC Pulse — Main Entry Point
// =============================================================================
//
// Serves a BTC/USD indicator snapshot over HTTP. Every request fetches fresh
// data; no upstream failure prevents a response.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod config;
mod error;
mod indicators;
mod market_data;
mod snapshot;
mod sources;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::ServiceConfig;
use crate::snapshot::SnapshotService;

/// Environment variable naming the JSON config file.
const CONFIG_PATH_ENV: &str = "BTC_PULSE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "service_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        BTC Pulse — Starting Up                           ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = ServiceConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(path = %config_path, error = %e, "Failed to load config, using defaults");
        ServiceConfig::default()
    });
    config.apply_env();
    config.sanitize();

    info!(
        bind_addr = %config.bind_addr,
        symbol = %config.sources.symbol,
        history_limit = config.sources.history_limit,
        substitution = ?config.substitution,
        coingecko_key = config.sources.coingecko_api_key.is_some(),
        "Configuration loaded"
    );

    // ── 2. Shared HTTP client & pipeline ─────────────────────────────────
    let client = sources::build_http_client(&config.sources)?;
    let service = SnapshotService::from_config(&client, &config);
    let state = Arc::new(AppState::new(config, service));

    // ── 3. API server ────────────────────────────────────────────────────
    let bind_addr = state.config.bind_addr.clone();
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 4. Graceful shutdown ─────────────────────────────────────────────
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            warn!("Shutdown signal received, stopping gracefully");
        })
        .await
        .context("API server failed")?;

    let stats = state.stats();
    info!(served = stats.served, failed = stats.failed, "BTC Pulse shut down complete.");
    Ok(())
}
