//! Unified API error type with Axum `IntoResponse` support.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// API error type that converts to proper HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<vmq_retrieval::RetrievalError> for ApiError {
    fn from(e: vmq_retrieval::RetrievalError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

/// Convenience alias.
pub type ApiResult<T> = Result<T, ApiError>;
