//! Retry with exponential backoff and jitter for transient upstream faults.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hnbest_core::{
    HnError, Middleware, Transport, UpstreamRequest, UpstreamResponse, is_transient_outcome,
};
use hnbest_types::RetryConfig;
use rand::Rng;

/// Un-jittered delay before retry number `retry` (0-based), in milliseconds:
/// `min_backoff * factor^retry`, capped at `max_backoff`.
#[must_use]
pub fn base_delay_ms(retry: u32, config: &RetryConfig) -> u64 {
    let growth = u64::from(config.factor.max(1)).saturating_pow(retry);
    config
        .min_backoff_ms
        .saturating_mul(growth)
        .min(config.max_backoff_ms)
}

/// Delay before retry number `retry` (0-based): the capped base delay spread
/// by up to `jitter_percent` of it.
///
/// Jitter is added when it fits under `max_backoff` and subtracted otherwise,
/// so delays that have reached the cap still differ from caller to caller.
#[must_use]
pub fn backoff_delay(retry: u32, config: &RetryConfig) -> Duration {
    let base = base_delay_ms(retry, config);
    let range = jitter_range(base, u32::from(config.jitter_percent.min(100)));
    let jitter = rand::rng().random_range(0..range);
    let delay = if base.saturating_add(range) <= config.max_backoff_ms {
        base + jitter
    } else {
        base.saturating_sub(jitter)
    };
    Duration::from_millis(delay)
}

fn jitter_range(base_ms: u64, jitter_percent: u32) -> u64 {
    if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    }
}

/// Transport wrapper that re-sends transient failures.
///
/// Retries connection failures, timeouts, and 408/429/5xx responses. When
/// retries are exhausted the last outcome is returned unchanged, so a final
/// 503 is still a response and not an error.
pub struct RetryingTransport {
    inner: Arc<dyn Transport>,
    config: RetryConfig,
}

impl RetryingTransport {
    /// Wrap `inner` with the given retry settings.
    #[must_use]
    pub const fn new(inner: Arc<dyn Transport>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl Transport for RetryingTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "hnbest::middleware::retry",
            skip(self, req),
            fields(path = %req.path()),
        )
    )]
    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        let mut retry = 0;
        loop {
            let outcome = self.inner.send(req).await;
            if retry >= self.config.max_retries || !is_transient_outcome(&outcome) {
                return outcome;
            }
            let delay = backoff_delay(retry, &self.config);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                retry = retry + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                status = outcome.as_ref().ok().map(|r| r.status),
                "transient upstream failure, backing off"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

/// Middleware config for constructing a [`RetryingTransport`].
pub struct RetryMiddleware {
    pub config: RetryConfig,
}

impl RetryMiddleware {
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

impl Middleware for RetryMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(RetryingTransport::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "RetryingTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "max_retries": self.config.max_retries,
            "min_backoff_ms": self.config.min_backoff_ms,
            "max_backoff_ms": self.config.max_backoff_ms,
            "factor": self.config.factor,
            "jitter_percent": self.config.jitter_percent,
        })
    }
}
