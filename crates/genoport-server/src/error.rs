//! API error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::bootstrap::BootstrapError;
use genoport_storage::StorageError;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Metadata bootstrap failed after exhausting its retries.
    #[error("metadata bootstrap failed: {0}")]
    BootstrapFailed(#[source] BootstrapError),

    /// The document store could not be reached.
    #[error("document store unavailable: {0}")]
    StoreUnavailable(#[source] StorageError),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<BootstrapError> for ApiError {
    fn from(err: BootstrapError) -> Self {
        Self::BootstrapFailed(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::BootstrapFailed(_) => (StatusCode::BAD_GATEWAY, "bootstrap-failed"),
            Self::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store-unavailable"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = json!({
            "error": code,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
