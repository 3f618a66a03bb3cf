use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use company_intel::IntelError;
use serde::Serialize;
use thiserror::Error;

/// Failures a route reports to the caller.
///
/// Orchestrators degrade instead of failing, so only request validation and
/// the write path (ingest) ever produce one of these.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal(String),
}

impl From<IntelError> for ApiError {
    fn from(err: IntelError) -> Self {
        match err {
            IntelError::AI(_) | IntelError::Timeout { .. } => {
                tracing::warn!(error = %err, "Completion backend failed");
                Self::Upstream("completion backend unavailable".to_string())
            }
            IntelError::Config(msg) => Self::Validation(msg),
            _ => {
                tracing::error!("Internal error: {:?}", err);
                Self::Internal("Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message),
            Self::Upstream(message) => (StatusCode::BAD_GATEWAY, message),
            Self::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        let body = ErrorResponse {
            error: message,
            status: "error".to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize, Debug)]
struct ErrorResponse {
    error: String,
    status: String,
}
