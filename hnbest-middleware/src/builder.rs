//! Builder for composing a transport with resilience layers.
//!
//! # Middleware Ordering Convention
//!
//! Layers form an "onion" around the raw transport:
//!
//! ```text
//! Caller
//!     ↓
//! ConcurrencyLimit (admits or rejects, holds a permit for the whole call)
//!     ↓
//! Retry (re-sends transient failures with backoff)
//!     ↓
//! CircuitBreaker (samples every attempt, fails fast while open)
//!     ↓
//! Timeout (bounds each attempt, whatever the raw transport does)
//!     ↓
//! Raw transport (performs the HTTP request)
//! ```
//!
//! `layers` is stored outermost-first: each `with_*` call inserts at index 0,
//! so the last layer added is the outermost. [`TransportBuilder::resilient`]
//! adds them in the order that yields the stack above.

use std::sync::Arc;

use hnbest_core::{Middleware, Transport};
use hnbest_types::{
    CircuitBreakerConfig, ConcurrencyLimitConfig, MiddlewareLayer, MiddlewareStack, RetryConfig,
    TransportConfig,
};
use serde_json::{Value, json};

use crate::breaker::CircuitBreakerMiddleware;
use crate::limiter::ConcurrencyLimitMiddleware;
use crate::retry::RetryMiddleware;
use crate::timeout::TimeoutMiddleware;

const LIMITER: &str = "ConcurrencyLimitedTransport";
const RETRY: &str = "RetryingTransport";
const BREAKER: &str = "CircuitBreakerTransport";
const TIMEOUT: &str = "TimeoutTransport";

/// Middleware builder for composing a transport with layered wrappers.
///
/// See [module-level documentation](self) for details on ordering.
pub struct TransportBuilder {
    raw: Arc<dyn Transport>,
    /// Middleware layers in outermost-first order.
    layers: Vec<Box<dyn Middleware>>,
}

impl TransportBuilder {
    /// Create a new builder from a raw, unwrapped transport.
    #[must_use]
    pub fn new(raw: Arc<dyn Transport>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    /// Builder preloaded with the standard stack:
    /// `ConcurrencyLimit(Retry(CircuitBreaker(Timeout(raw))))`, with
    /// `config.timeout` as the per-attempt deadline.
    #[must_use]
    pub fn resilient(raw: Arc<dyn Transport>, config: &TransportConfig) -> Self {
        Self::new(raw)
            .with_timeout(config.timeout)
            .with_circuit_breaker(config.breaker)
            .with_retry(config.retry)
            .with_concurrency_limit(config.limiter)
    }

    /// Add or replace the concurrency limiter as the outermost layer.
    #[must_use]
    pub fn with_concurrency_limit(self, cfg: ConcurrencyLimitConfig) -> Self {
        self.without(LIMITER)
            .layer(Box::new(ConcurrencyLimitMiddleware::new(cfg)))
    }

    /// Remove the concurrency limiter if present.
    #[must_use]
    pub fn without_concurrency_limit(self) -> Self {
        self.without(LIMITER)
    }

    /// Add or replace retry as the outermost layer.
    #[must_use]
    pub fn with_retry(self, cfg: RetryConfig) -> Self {
        self.without(RETRY).layer(Box::new(RetryMiddleware::new(cfg)))
    }

    /// Remove retry if present.
    #[must_use]
    pub fn without_retry(self) -> Self {
        self.without(RETRY)
    }

    /// Add or replace the circuit breaker as the outermost layer.
    #[must_use]
    pub fn with_circuit_breaker(self, cfg: CircuitBreakerConfig) -> Self {
        self.without(BREAKER)
            .layer(Box::new(CircuitBreakerMiddleware::new(cfg)))
    }

    /// Remove the circuit breaker if present.
    #[must_use]
    pub fn without_circuit_breaker(self) -> Self {
        self.without(BREAKER)
    }

    /// Add or replace the per-attempt deadline as the outermost layer.
    #[must_use]
    pub fn with_timeout(self, timeout: std::time::Duration) -> Self {
        self.without(TIMEOUT)
            .layer(Box::new(TimeoutMiddleware::new(timeout)))
    }

    /// Remove the deadline layer if present.
    #[must_use]
    pub fn without_timeout(self) -> Self {
        self.without(TIMEOUT)
    }

    fn without(mut self, name: &str) -> Self {
        self.layers.retain(|m| m.name() != name);
        self
    }

    /// Add an arbitrary middleware layer at the outermost position.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Export the current middleware stack configuration for inspection.
    ///
    /// The raw transport is appended as the innermost "layer" for observability.
    #[must_use]
    pub fn to_stack(&self) -> MiddlewareStack {
        let mut stack = MiddlewareStack::new();
        for layer in &self.layers {
            stack.push_inner(MiddlewareLayer::new(layer.name(), layer.config_json()));
        }
        stack.push_inner(MiddlewareLayer::new(
            "RawTransport",
            json!({ "name": self.raw.name() }),
        ));
        stack
    }

    /// Construct a builder from a raw transport and an explicit stack.
    ///
    /// Missing settings fall back to their defaults. Unknown layer names are
    /// ignored. This is the inverse of [`to_stack`](Self::to_stack).
    #[must_use]
    pub fn from_stack(raw: Arc<dyn Transport>, stack: &MiddlewareStack) -> Self {
        let mut layers: Vec<Box<dyn Middleware>> = Vec::new();
        for l in &stack.layers {
            match l.name.as_str() {
                LIMITER => {
                    let d = ConcurrencyLimitConfig::default();
                    let cfg = ConcurrencyLimitConfig {
                        permit_limit: get_usize(&l.config, "permit_limit", d.permit_limit),
                        queue_limit: get_usize(&l.config, "queue_limit", d.queue_limit),
                    };
                    layers.push(Box::new(ConcurrencyLimitMiddleware::new(cfg)));
                }
                RETRY => {
                    let d = RetryConfig::default();
                    let cfg = RetryConfig {
                        max_retries: get_u64(&l.config, "max_retries", d.max_retries.into())
                            .try_into()
                            .unwrap_or(d.max_retries),
                        min_backoff_ms: get_u64(&l.config, "min_backoff_ms", d.min_backoff_ms),
                        max_backoff_ms: get_u64(&l.config, "max_backoff_ms", d.max_backoff_ms),
                        factor: get_u64(&l.config, "factor", d.factor.into())
                            .try_into()
                            .unwrap_or(d.factor),
                        jitter_percent: get_u64(&l.config, "jitter_percent", d.jitter_percent.into())
                            .try_into()
                            .unwrap_or(d.jitter_percent),
                    };
                    layers.push(Box::new(RetryMiddleware::new(cfg)));
                }
                BREAKER => {
                    let d = CircuitBreakerConfig::default();
                    let cfg = CircuitBreakerConfig {
                        sampling_window: get_ms(&l.config, "sampling_window_ms", d.sampling_window),
                        failure_ratio: l
                            .config
                            .get("failure_ratio")
                            .and_then(Value::as_f64)
                            .unwrap_or(d.failure_ratio),
                        minimum_throughput: get_u64(
                            &l.config,
                            "minimum_throughput",
                            d.minimum_throughput,
                        ),
                        break_duration: get_ms(&l.config, "break_duration_ms", d.break_duration),
                    };
                    layers.push(Box::new(CircuitBreakerMiddleware::new(cfg)));
                }
                TIMEOUT => {
                    let timeout = get_ms(&l.config, "timeout_ms", TransportConfig::default().timeout);
                    layers.push(Box::new(TimeoutMiddleware::new(timeout)));
                }
                _ => {}
            }
        }
        Self { raw, layers }
    }

    /// Build the wrapped transport according to the captured stack.
    ///
    /// Layers are applied innermost first, so `layers = [A, B]` yields `A(B(raw))`.
    #[must_use]
    pub fn build(self) -> Arc<dyn Transport> {
        let mut acc: Arc<dyn Transport> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}

fn get_u64(cfg: &Value, key: &str, default: u64) -> u64 {
    cfg.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn get_usize(cfg: &Value, key: &str, default: usize) -> usize {
    cfg.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

fn get_ms(cfg: &Value, key: &str, default: std::time::Duration) -> std::time::Duration {
    cfg.get(key)
        .and_then(Value::as_u64)
        .map_or(default, std::time::Duration::from_millis)
}
