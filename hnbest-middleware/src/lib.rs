//! hnbest-middleware
//!
//! Decorators that wrap an [`hnbest_core::Transport`] with one resilience
//! policy each, and a builder that composes them.
//!
//! The standard composition, outermost first, is
//! `ConcurrencyLimit(Retry(CircuitBreaker(Timeout(raw))))`: one limiter permit
//! covers a call together with its retries, the breaker sees each individual
//! attempt, and every attempt has a deadline.

mod breaker;
mod builder;
mod limiter;
mod retry;
mod timeout;

pub use crate::breaker::{CircuitBreakerMiddleware, CircuitBreakerTransport, CircuitState};
pub use crate::builder::TransportBuilder;
pub use crate::limiter::{
    ConcurrencyLimitMiddleware, ConcurrencyLimitedTransport, LimiterPermit, PermitQueue,
};
pub use crate::retry::{RetryMiddleware, RetryingTransport, backoff_delay, base_delay_ms};
pub use crate::timeout::{TimeoutMiddleware, TimeoutTransport};
