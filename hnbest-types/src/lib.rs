//! hnbest-specific data transfer objects, configuration primitives, and the
//! unified error type shared by every crate in the workspace.
#![warn(missing_docs)]

mod config;
mod error;
mod item;
mod middleware;
mod resource;

pub use config::{
    BestStoriesConfig, CircuitBreakerConfig, ConcurrencyLimitConfig, RetryConfig, TransportConfig,
};
pub use error::HnError;
pub use item::{ItemId, PublicStoryView, UpstreamItem, unix_to_iso8601};
pub use middleware::{MiddlewareLayer, MiddlewareStack};
pub use resource::Resource;
