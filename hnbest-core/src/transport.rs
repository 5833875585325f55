use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::{HnError, Resource};

/// An outbound GET request, addressed relative to the transport's base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamRequest {
    path: String,
}

impl UpstreamRequest {
    /// Request for an arbitrary relative path.
    pub fn get(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Request for a known upstream resource.
    #[must_use]
    pub fn resource(resource: Resource) -> Self {
        Self::get(resource.path())
    }

    /// Relative path (no leading slash).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Status and body of a completed upstream call.
///
/// A response is returned for every status code; deciding whether a status is
/// an error belongs to the caller (or to a retry/breaker decorator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// Construct a response from parts.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Construct a response carrying a JSON body.
    #[must_use]
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    /// 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    /// Returns `HnError::Data` if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HnError> {
        serde_json::from_slice(&self.body).map_err(|e| HnError::Data(e.to_string()))
    }
}

/// Whether a status code denotes a transient upstream fault: request timeout,
/// throttling, or any server error.
#[must_use]
pub const fn is_transient_status(status: u16) -> bool {
    status == 408 || status == 429 || status >= 500
}

/// Whether a call outcome counts as a transient failure.
///
/// Shared by the retry and circuit breaker decorators so both agree on what a
/// failure is. Local fast-fail rejections are not counted.
#[must_use]
pub fn is_transient_outcome(outcome: &Result<UpstreamResponse, HnError>) -> bool {
    match outcome {
        Ok(resp) => is_transient_status(resp.status),
        Err(e) => e.is_transient(),
    }
}

/// The single "perform HTTP request" capability.
///
/// Raw transports talk to the network; decorators (see [`crate::Middleware`])
/// wrap another `Transport` and add a policy around `send`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name for logging and error attribution.
    fn name(&self) -> &'static str;

    /// Perform one request.
    ///
    /// Returns `Ok` for every HTTP response regardless of status; `Err` is
    /// reserved for calls that produced no response (connection failure,
    /// timeout, local rejection).
    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_statuses() {
        for s in [408u16, 429, 500, 502, 503, 504, 599] {
            assert!(is_transient_status(s), "{s} should be transient");
        }
        for s in [200u16, 204, 301, 400, 401, 403, 404, 410] {
            assert!(!is_transient_status(s), "{s} should not be transient");
        }
    }

    #[test]
    fn fast_fail_errors_are_not_transient_outcomes() {
        let open: Result<UpstreamResponse, HnError> = Err(HnError::CircuitOpen { reset_in_ms: 1 });
        assert!(!is_transient_outcome(&open));
        let refused: Result<UpstreamResponse, HnError> =
            Err(HnError::connection("raw", "connection refused"));
        assert!(is_transient_outcome(&refused));
    }

    #[test]
    fn json_decode_failure_is_data_error() {
        let resp = UpstreamResponse::new(200, "not json");
        let err = resp.json::<Vec<u64>>().unwrap_err();
        assert!(matches!(err, HnError::Data(_)));
    }
}
