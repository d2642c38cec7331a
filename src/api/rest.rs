// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// The snapshot endpoint is method-agnostic and mounted twice: under
// `/api/v1/btc` and under the path existing dashboards already call. Every
// response carries `Access-Control-Allow-Origin: *`.
//
// Degraded data is still a 200; only an internal error maps to 500.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::snapshot::MarketSnapshot;
use crate::types::HistorySource;

/// Path the existing dashboards call.
pub const LEGACY_SNAPSHOT_PATH: &str = "/.netlify/functions/fetch-btc-data";

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/btc", any(btc_snapshot))
        .route(LEGACY_SNAPSHOT_PATH, any(btc_snapshot))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// Pipeline invariant broken; details go to the log, not the client.
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(err) => {
                error!(error = %format!("{err:#}"), "snapshot invocation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({
                        "error": "Function execution failed. Please check logs."
                    })),
                )
                    .into_response()
            }
        }
    }
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    served: u64,
    failed: u64,
    last_data_source: Option<HistorySource>,
    last_served_at: Option<String>,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.stats();
    Json(HealthResponse {
        status: "ok",
        served: stats.served,
        failed: stats.failed,
        last_data_source: stats.last_data_source,
        last_served_at: stats.last_served_at,
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Snapshot
// =============================================================================

async fn btc_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MarketSnapshot>, ApiError> {
    let span = info_span!("snapshot", request_id = %Uuid::new_v4());
    match state.service.snapshot().instrument(span).await {
        Ok(snapshot) => {
            state.record_served(snapshot.data_source);
            Ok(Json(snapshot))
        }
        Err(err) => {
            state.record_failure();
            Err(ApiError::Internal(err))
        }
    }
}
