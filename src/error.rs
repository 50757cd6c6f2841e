//! Error types for the annatar service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use annatar_search::SearchError;

/// Top-level error type for the HTTP service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Invalid or missing environment configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A request parameter failed to parse or validate.
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Error raised by the aggregation engine.
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Search(SearchError::Config(_)) => StatusCode::BAD_REQUEST,
            Self::Search(SearchError::NoResultsAvailable(_)) => StatusCode::BAD_GATEWAY,
            Self::Search(SearchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Search(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::BadRequest(_) => "bad_request",
            Self::Search(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        (
            status,
            Json(serde_json::json!({
                "error": self.to_string(),
                "kind": self.kind(),
            })),
        )
            .into_response()
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
