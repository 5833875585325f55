//! hnbest-core
//!
//! Core traits and primitives shared across the hnbest workspace.
//!
//! - `transport`: the single "perform HTTP request" capability every outbound
//!   call goes through, plus its request/response types.
//! - `middleware`: the trait implemented by transport decorators.
//! - `coalesce`: a keyed TTL cache with single-flight fetch semantics.
//! - `rank`: score ordering for the public projection.
//!
//! Async runtime (Tokio)
//! ---------------------
//! The cache uses `tokio::sync::watch` to wake waiters and `tokio::time::Instant`
//! for expiry, so it must run under a Tokio 1.x runtime. Tests drive time with
//! `tokio::time::pause`.
#![warn(missing_docs)]

/// Single-flight TTL cache.
pub mod coalesce;
/// Middleware trait implemented by transport wrappers.
pub mod middleware;
/// Score ordering helpers.
pub mod rank;
/// Outbound transport capability and its request/response types.
pub mod transport;

pub use coalesce::CoalescingCache;
pub use middleware::Middleware;
pub use rank::sort_by_score_desc;
pub use transport::{
    Transport, UpstreamRequest, UpstreamResponse, is_transient_outcome, is_transient_status,
};

pub use hnbest_types::*;
