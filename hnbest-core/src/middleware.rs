//! Middleware trait for wrapping `Transport` implementations.

use std::sync::Arc;

use crate::transport::Transport;

/// Trait implemented by transport middleware layers.
///
/// A middleware consumes an inner `Transport` and returns a wrapped transport
/// that adds a policy around every call (limiting, retrying, circuit breaking).
pub trait Middleware: Send + Sync {
    /// Apply this middleware to wrap an inner transport and return the wrapped transport.
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport>;

    /// Middleware name for introspection/logging.
    fn name(&self) -> &'static str;

    /// Opaque configuration snapshot for serialization/inspection.
    fn config_json(&self) -> serde_json::Value;
}
