//! hnbest serves the top N Hacker News "best stories", ranked by score.
//!
//! Overview
//! - The ranked id list and every item record are read through a
//!   [`CoalescingCache`](hnbest_core::CoalescingCache), so concurrent misses for
//!   the same key share one upstream call.
//! - Every upstream call goes through an injected
//!   [`Transport`](hnbest_core::Transport), normally the resilient stack built by
//!   [`TransportBuilder::resilient`].
//! - A process-wide fetch budget caps outstanding upstream calls, and a separate
//!   dispatch limit (CPU cores × a per-core factor) caps item fetches in flight.
//!
//! Failure model
//! - The ranked list is required: if it cannot be obtained the request fails with
//!   `HnError::UpstreamUnavailable`.
//! - Items are best effort: missing items (404 or `null`) and failed fetches are
//!   left out, so a response may hold fewer than N stories.
//!
//! Example
//! ```rust,ignore
//! use std::sync::Arc;
//! use hnbest::{BestStories, TransportBuilder, TransportConfig};
//!
//! let cfg = TransportConfig::default();
//! let raw = Arc::new(hnbest_http::HnHttpTransport::try_new(&cfg)?);
//! let best = BestStories::builder()
//!     .transport(TransportBuilder::resilient(raw, &cfg).build())
//!     .build()?;
//! let top = best.top_n(10).await?;
//! ```
#![warn(missing_docs)]

mod budget;
pub(crate) mod core;
mod ids;
mod items;
mod validate;

pub use crate::budget::FetchBudget;
pub use crate::core::{BestStories, BestStoriesBuilder};
pub use crate::ids::{BEST_IDS_KEY, RankedIdsFetcher};
pub use crate::items::ItemFetcher;
pub use crate::validate::{check_count, parse_count};

pub use hnbest_middleware::{
    CircuitBreakerMiddleware, ConcurrencyLimitMiddleware, RetryMiddleware, TimeoutMiddleware,
    TransportBuilder,
};

// Re-export core types for convenience
pub use hnbest_core::{
    BestStoriesConfig, CircuitBreakerConfig, ConcurrencyLimitConfig, HnError, ItemId,
    PublicStoryView, RetryConfig, Transport, TransportConfig, UpstreamItem,
};
