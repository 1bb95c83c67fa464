//! Metrics worker endpoint
//!
//! `POST /identify-duplicates` scores a batch of candidates against one
//! target, so another deployment can use this one as its remote worker.
//! Scoring here is always local.

use axum::{routing::post, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::services::metrics_worker::{
    IdentifyRequest, IdentifyResponse, LocalMetricsWorker, MetricsWorker, WireScoredCandidate,
};
use crate::AppState;

/// POST /identify-duplicates
pub async fn identify_duplicates(body: String) -> ApiResult<Json<IdentifyResponse>> {
    let request: IdentifyRequest = serde_json::from_str(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid worker request: {}", e)))?;

    let scored = LocalMetricsWorker
        .compute_metrics(&request.s1, request.responses)
        .await?;

    tracing::debug!(candidates = scored.len(), "Scored worker batch");

    Ok(Json(IdentifyResponse {
        error: false,
        responses_with_metrics: Some(scored.into_iter().map(WireScoredCandidate::from).collect()),
        problem: None,
    }))
}

/// Build worker routes
pub fn identify_routes() -> Router<AppState> {
    Router::new().route("/identify-duplicates", post(identify_duplicates))
}
