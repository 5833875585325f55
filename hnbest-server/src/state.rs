use std::sync::Arc;

use hnbest::{BestStories, ConcurrencyLimitConfig};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::limiter::ClientLimiter;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The best-stories orchestrator.
    pub stories: Arc<BestStories>,
    /// Per-client inbound limiter.
    pub clients: Arc<ClientLimiter>,
}

impl AppState {
    /// State over an existing orchestrator.
    #[must_use]
    pub fn new(stories: Arc<BestStories>, client_limit: ConcurrencyLimitConfig) -> Self {
        Self {
            stories,
            clients: Arc::new(ClientLimiter::new(client_limit)),
        }
    }

    /// Wire the HTTP transport, resilience stack and orchestrator from config.
    ///
    /// # Errors
    /// Returns `ServerError::Build` if the transport or orchestrator cannot be built.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let raw = Arc::new(hnbest_http::HnHttpTransport::try_new(&config.transport)?);
        let stories = BestStories::builder()
            .config(config.stories.clone())
            .resilient_transport(raw, &config.transport)
            .build()?;
        Ok(Self::new(Arc::new(stories), config.client_limit))
    }
}
