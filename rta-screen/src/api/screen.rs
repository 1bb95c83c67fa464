//! Screening endpoint
//!
//! `POST /` and `POST /screen` accept
//! `{questions, survey_id, participant_id, responses}` and return the checks
//! raised per question together with the assigned response groups.

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::body::parse_body;
use crate::error::{ApiError, ApiResult};
use crate::services::{ScreeningOutcome, ScreeningRequest};
use crate::AppState;

/// Successful screening response body
#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub error: bool,
    #[serde(flatten)]
    pub outcome: ScreeningOutcome,
}

/// POST / and POST /screen
pub async fn screen_submission(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<ScreenResponse>> {
    let value = parse_body(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let request = ScreeningRequest::from_json(value)?;

    tracing::debug!(
        survey_id = %request.survey_id,
        participant_id = %request.participant_id,
        questions = request.questions.len(),
        "Screening request received"
    );

    let span = tracing::info_span!("screen", request_id = %Uuid::new_v4());
    let outcome = state.screening.screen(request).instrument(span).await?;

    Ok(Json(ScreenResponse {
        error: false,
        outcome,
    }))
}

/// Build screening routes
pub fn screen_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(screen_submission))
        .route("/screen", post(screen_submission))
}
