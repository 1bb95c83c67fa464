//! rta-screen library interface
//!
//! Screens free-text survey answers for duplicates:
//! - cross-duplicates against other participants' earlier answers, with
//!   response group assignment
//! - self-duplicates among one participant's own answers
//!
//! Exposes the building blocks for integration testing.

pub mod api;
pub mod error;
pub mod matching;
pub mod services;
pub mod store;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderName, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use rta_common::config::ScreenConfig;
use services::{
    CrossDuplicateChecker, HttpMetricsWorker, LocalMetricsWorker, MetricsWorker,
    ScreeningService, ScreeningStats,
};
use std::sync::Arc;
use std::time::Duration;
use store::ResponseStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Storage backend selected at startup
    pub store: Arc<dyn ResponseStore>,
    /// Metrics worker used by the cross-duplicate check
    pub worker: Arc<dyn MetricsWorker>,
    /// Degraded-path counters
    pub stats: Arc<ScreeningStats>,
    /// Request-level screening
    pub screening: ScreeningService,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: &ScreenConfig,
        store: Arc<dyn ResponseStore>,
        worker: Arc<dyn MetricsWorker>,
    ) -> Self {
        let stats = Arc::new(ScreeningStats::new());
        let checker =
            CrossDuplicateChecker::new(store.clone(), worker.clone(), stats.clone(), config);
        let screening = ScreeningService::new(
            checker,
            store.clone(),
            Duration::from_millis(config.request_timeout_ms),
        );

        Self {
            store,
            worker,
            stats,
            screening,
            startup_time: Utc::now(),
        }
    }

    /// Build state from configuration alone
    ///
    /// Opens the configured storage backend and picks the remote worker when
    /// `worker.url` is set, the local one otherwise.
    pub async fn from_config(config: &ScreenConfig) -> rta_common::Result<Self> {
        let store = store::open_store(config).await?;
        let worker = build_worker(config)?;
        Ok(Self::new(config, store, worker))
    }
}

/// Metrics worker named in configuration
pub fn build_worker(config: &ScreenConfig) -> rta_common::Result<Arc<dyn MetricsWorker>> {
    match &config.worker.url {
        Some(url) => {
            let worker =
                HttpMetricsWorker::new(url.clone(), Duration::from_millis(config.worker.timeout_ms))
                    .map_err(|e| rta_common::Error::Config(e.to_string()))?;
            tracing::info!(url = %url, "Using remote metrics worker");
            Ok(Arc::new(worker))
        }
        None => {
            tracing::info!("Using local metrics worker");
            Ok(Arc::new(LocalMetricsWorker))
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-api-key")]);

    Router::new()
        .merge(api::screen_routes())
        .merge(api::identify_routes())
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
