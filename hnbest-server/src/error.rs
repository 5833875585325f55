use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hnbest::HnError;
use serde_json::json;

/// Startup failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// An environment variable is set but does not parse.
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// The orchestrator or transport could not be constructed.
    #[error(transparent)]
    Build(#[from] HnError),

    /// Binding or serving the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level error rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A domain error from the orchestrator.
    #[error(transparent)]
    Core(#[from] HnError),

    /// The caller's inbound concurrency allowance is exhausted.
    #[error("Too many concurrent requests.")]
    TooManyRequests,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Core(HnError::InvalidArg(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Core(e @ HnError::UpstreamUnavailable { .. }) => {
                tracing::warn!(error = %e, "upstream unavailable");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Core(e) => {
                tracing::error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
