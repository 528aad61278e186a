//! HTTP mapping for coordination errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use carebridge_coordination::CoordinationError;

/// Wrapper turning a `CoordinationError` into a JSON problem response.
#[derive(Debug)]
pub struct ApiError(pub CoordinationError);

impl From<CoordinationError> for ApiError {
    fn from(err: CoordinationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoordinationError::Validation(_) => StatusCode::BAD_REQUEST,
            CoordinationError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoordinationError::Conflict(_) => StatusCode::CONFLICT,
            CoordinationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "category": self.0.category(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
