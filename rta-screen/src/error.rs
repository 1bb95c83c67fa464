//! Error types for rta-screen HTTP handlers

use crate::services::{ScreeningError, WorkerError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
///
/// Every variant renders as `{"error": true, "problem": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Request exceeded its time budget (500)
    #[error("Request timed out")]
    TimedOut,

    /// Metric computation failed (500)
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl From<ScreeningError> for ApiError {
    fn from(err: ScreeningError) -> Self {
        match err {
            ScreeningError::Invalid(msg) => ApiError::BadRequest(msg),
            ScreeningError::TimedOut => ApiError::TimedOut,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::TimedOut | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": true,
            "problem": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screening_errors_map_to_status() {
        let bad = ApiError::from(ScreeningError::Invalid("Missing responses".to_string()));
        assert_eq!(bad.to_string(), "Missing responses");
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let timeout = ApiError::from(ScreeningError::TimedOut);
        assert_eq!(timeout.to_string(), "Request timed out");
        assert_eq!(timeout.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
