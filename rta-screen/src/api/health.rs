//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;

use crate::services::StatsSnapshot;
use crate::AppState;

/// How long a degraded path keeps `/health` reporting "degraded"
pub const DEGRADED_WINDOW: Duration = Duration::from_secs(300);

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" if a fallback path was taken within `DEGRADED_WINDOW`
    pub status: String,
    /// Module name ("rta-screen")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Storage backend in use
    pub storage: String,
    /// Metrics worker in use
    pub worker: String,
    /// Seconds since the latest fallback path, if any
    pub last_degraded_seconds_ago: Option<u64>,
    /// Screening counters since startup
    pub stats: StatsSnapshot,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let status = if state.stats.is_degraded_within(DEGRADED_WINDOW) {
        "degraded"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status: status.to_string(),
        module: "rta-screen".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        storage: state.store.name().to_string(),
        worker: state.worker.name().to_string(),
        last_degraded_seconds_ago: state.stats.since_last_degraded().map(|since| since.as_secs()),
        stats: state.stats.snapshot(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
