//! Per-attempt deadline for any transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hnbest_core::{HnError, Middleware, Transport, UpstreamRequest, UpstreamResponse};

/// Transport wrapper that fails a call with `HnError::Timeout` once `timeout`
/// has elapsed, whatever the inner transport does.
pub struct TimeoutTransport {
    inner: Arc<dyn Transport>,
    timeout: Duration,
}

impl TimeoutTransport {
    /// Wrap `inner` with a deadline of `timeout` per call.
    #[must_use]
    pub const fn new(inner: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait]
impl Transport for TimeoutTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        (tokio::time::timeout(self.timeout, self.inner.send(req)).await).unwrap_or_else(|_| {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                path = req.path(),
                timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                "upstream call timed out"
            );
            Err(HnError::timeout(req.path(), self.timeout))
        })
    }
}

/// Middleware config for constructing a [`TimeoutTransport`].
pub struct TimeoutMiddleware {
    pub timeout: Duration,
}

impl TimeoutMiddleware {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Middleware for TimeoutMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(TimeoutTransport::new(inner, self.timeout))
    }

    fn name(&self) -> &'static str {
        "TimeoutTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "timeout_ms": u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }
}
