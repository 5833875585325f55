use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use hnbest::{BestStoriesConfig, ConcurrencyLimitConfig, TransportConfig};

use crate::error::ServerError;

/// Server configuration loaded from environment variables.
///
/// | Env Var                     | Default                                  |
/// |-----------------------------|------------------------------------------|
/// | `HNBEST_BIND`               | `0.0.0.0:8080`                           |
/// | `HNBEST_BASE_URL`           | `https://hacker-news.firebaseio.com/v0/` |
/// | `HNBEST_TIMEOUT_SECS`       | `10`                                     |
/// | `HNBEST_IDS_TTL_SECS`       | `1`                                      |
/// | `HNBEST_ITEM_TTL_SECS`      | `600`                                    |
/// | `HNBEST_THREADS_PER_CORE`   | `10`                                     |
/// | `HNBEST_MAX_N`              | `1000`                                   |
/// | `HNBEST_REQUEST_SEMAPHORE`  | `1000`                                   |
/// | `HNBEST_PERMIT_LIMIT`       | `100`                                    |
/// | `HNBEST_QUEUE_LIMIT`        | `1000`                                   |
/// | `HNBEST_MAX_RETRIES`        | `3`                                      |
/// | `HNBEST_BREAK_SECS`         | `60`                                     |
/// | `HNBEST_CLIENT_PERMITS`     | `10`                                     |
/// | `HNBEST_CLIENT_QUEUE`       | `100`                                    |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Outbound channel settings.
    pub transport: TransportConfig,
    /// Orchestrator settings.
    pub stories: BestStoriesConfig,
    /// Per-client inbound limiter settings.
    pub client_limit: ConcurrencyLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            transport: TransportConfig::default(),
            stories: BestStoriesConfig::default(),
            client_limit: ConcurrencyLimitConfig {
                permit_limit: 10,
                queue_limit: 100,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ServerError::InvalidEnv` for any variable that is set but does not parse.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup; unset keys keep defaults.
    ///
    /// # Errors
    /// Returns `ServerError::InvalidEnv` for any value that does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let var = |key: &'static str| lookup(key);

        if let Some(v) = var("HNBEST_BIND") {
            cfg.bind = parse("HNBEST_BIND", v)?;
        }
        if let Some(v) = var("HNBEST_BASE_URL") {
            cfg.transport.base_url = v;
        }
        if let Some(v) = var("HNBEST_TIMEOUT_SECS") {
            cfg.transport.timeout = Duration::from_secs(parse("HNBEST_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = var("HNBEST_IDS_TTL_SECS") {
            cfg.stories.ids_ttl = Duration::from_secs(parse("HNBEST_IDS_TTL_SECS", v)?);
        }
        if let Some(v) = var("HNBEST_ITEM_TTL_SECS") {
            cfg.stories.item_ttl = Duration::from_secs(parse("HNBEST_ITEM_TTL_SECS", v)?);
        }
        if let Some(v) = var("HNBEST_THREADS_PER_CORE") {
            cfg.stories.item_fetches_per_core = parse("HNBEST_THREADS_PER_CORE", v)?;
        }
        if let Some(v) = var("HNBEST_MAX_N") {
            cfg.stories.max_n = parse("HNBEST_MAX_N", v)?;
        }
        if let Some(v) = var("HNBEST_REQUEST_SEMAPHORE") {
            cfg.stories.request_budget = parse("HNBEST_REQUEST_SEMAPHORE", v)?;
        }
        if let Some(v) = var("HNBEST_PERMIT_LIMIT") {
            cfg.transport.limiter.permit_limit = parse("HNBEST_PERMIT_LIMIT", v)?;
        }
        if let Some(v) = var("HNBEST_QUEUE_LIMIT") {
            cfg.transport.limiter.queue_limit = parse("HNBEST_QUEUE_LIMIT", v)?;
        }
        if let Some(v) = var("HNBEST_MAX_RETRIES") {
            cfg.transport.retry.max_retries = parse("HNBEST_MAX_RETRIES", v)?;
        }
        if let Some(v) = var("HNBEST_BREAK_SECS") {
            cfg.transport.breaker.break_duration =
                Duration::from_secs(parse("HNBEST_BREAK_SECS", v)?);
        }
        if let Some(v) = var("HNBEST_CLIENT_PERMITS") {
            cfg.client_limit.permit_limit = parse("HNBEST_CLIENT_PERMITS", v)?;
        }
        if let Some(v) = var("HNBEST_CLIENT_QUEUE") {
            cfg.client_limit.queue_limit = parse("HNBEST_CLIENT_QUEUE", v)?;
        }
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, ServerError> {
    value
        .trim()
        .parse()
        .map_err(|_| ServerError::InvalidEnv { key, value })
}
