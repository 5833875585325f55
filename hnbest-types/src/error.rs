use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the hnbest workspace.
///
/// The type is `Clone` because a single coalesced fetch delivers the same
/// outcome to every caller waiting on it.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HnError {
    /// The outbound connection could not be established or broke mid-flight.
    #[error("connection to {transport} failed: {msg}")]
    Connection {
        /// Transport name that failed.
        transport: String,
        /// Human-readable error message.
        msg: String,
    },

    /// A single outbound call exceeded its deadline.
    #[error("upstream call timed out after {after_ms}ms: {path}")]
    Timeout {
        /// Relative path of the request that timed out.
        path: String,
        /// Configured deadline in milliseconds.
        after_ms: u64,
    },

    /// The upstream answered with a status the caller cannot use.
    #[error("upstream returned HTTP {status} for {resource}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
        /// Resource label (e.g. "item/8863").
        resource: String,
    },

    /// The concurrency limiter queue is full; the call was rejected without waiting.
    #[error("capacity exceeded: permit_limit={permit_limit} queue_limit={queue_limit}")]
    CapacityExceeded {
        /// Configured number of concurrent permits.
        permit_limit: usize,
        /// Configured queue length.
        queue_limit: usize,
    },

    /// The circuit breaker is open; calls fail fast until `reset_in_ms` elapses.
    #[error("circuit open: reset_in_ms={reset_in_ms}")]
    CircuitOpen {
        /// Milliseconds remaining until a probe call is admitted.
        reset_in_ms: u64,
    },

    /// The response body did not match the expected shape.
    #[error("data issue: {0}")]
    Data(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The ranked id list could not be obtained; no partial ranking is possible.
    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable {
        /// Description of the underlying failure.
        reason: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl HnError {
    /// Helper: build a `Connection` error with the transport name and message.
    pub fn connection(transport: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Connection {
            transport: transport.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `Timeout` error for a request path.
    pub fn timeout(path: impl Into<String>, after: std::time::Duration) -> Self {
        Self::Timeout {
            path: path.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Helper: build an `UpstreamStatus` error.
    pub fn upstream_status(status: u16, resource: impl Into<String>) -> Self {
        Self::UpstreamStatus {
            status,
            resource: resource.into(),
        }
    }

    /// Helper: wrap any failure as `UpstreamUnavailable`.
    #[must_use]
    pub fn upstream_unavailable(cause: &Self) -> Self {
        Self::UpstreamUnavailable {
            reason: cause.to_string(),
        }
    }

    /// Returns true for faults worth retrying: connection failures and timeouts.
    ///
    /// Status-based retry decisions are made on responses, not on errors.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Returns true when the call was rejected locally without touching the network.
    #[must_use]
    pub const fn is_fast_fail(&self) -> bool {
        matches!(
            self,
            Self::CapacityExceeded { .. } | Self::CircuitOpen { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeout_helper_records_millis() {
        let e = HnError::timeout("item/1.json", Duration::from_secs(10));
        assert_eq!(
            e,
            HnError::Timeout {
                path: "item/1.json".into(),
                after_ms: 10_000
            }
        );
        assert!(e.is_transient());
        assert!(!e.is_fast_fail());
    }

    #[test]
    fn local_rejections_are_fast_fail_not_transient() {
        let cap = HnError::CapacityExceeded {
            permit_limit: 1,
            queue_limit: 0,
        };
        let open = HnError::CircuitOpen { reset_in_ms: 5 };
        assert!(cap.is_fast_fail() && !cap.is_transient());
        assert!(open.is_fast_fail() && !open.is_transient());
    }

    #[test]
    fn unavailable_keeps_cause_text() {
        let cause = HnError::connection("hn-http", "refused");
        let e = HnError::upstream_unavailable(&cause);
        assert_eq!(
            e.to_string(),
            "upstream unavailable: connection to hn-http failed: refused"
        );
    }
}
