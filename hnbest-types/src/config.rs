//! Configuration types shared across the orchestrator, middleware, and transports.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded-concurrency limiter settings for outbound calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyLimitConfig {
    /// Maximum number of calls in flight at once.
    pub permit_limit: usize,
    /// Maximum number of callers waiting (FIFO) for a permit; beyond this, calls
    /// are rejected immediately.
    pub queue_limit: usize,
}

impl Default for ConcurrencyLimitConfig {
    fn default() -> Self {
        Self {
            permit_limit: 100,
            queue_limit: 1000,
        }
    }
}

/// Exponential backoff configuration for retrying transient upstream faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed beyond the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub min_backoff_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor applied per attempt (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_backoff_ms: 2_000,
            max_backoff_ms: 10_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Rolling window over which outcomes are sampled.
    pub sampling_window: Duration,
    /// Failure ratio in `[0, 1]` at or above which the circuit opens.
    pub failure_ratio: f64,
    /// Minimum number of calls in the window before the ratio is evaluated.
    pub minimum_throughput: u64,
    /// How long the circuit stays open before admitting a probe.
    pub break_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            sampling_window: Duration::from_secs(30),
            failure_ratio: 0.2,
            minimum_throughput: 100,
            break_duration: Duration::from_secs(60),
        }
    }
}

/// Outbound channel configuration: target host, per-call deadline, and the
/// resilience policies wrapped around every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Absolute base URL; request paths are joined onto it.
    pub base_url: String,
    /// Deadline for a single outbound call (one attempt).
    pub timeout: Duration,
    /// Concurrency limiter settings.
    pub limiter: ConcurrencyLimitConfig,
    /// Retry settings.
    pub retry: RetryConfig,
    /// Circuit breaker settings.
    pub breaker: CircuitBreakerConfig,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hacker-news.firebaseio.com/v0/".to_string(),
            timeout: Duration::from_secs(10),
            limiter: ConcurrencyLimitConfig::default(),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestStoriesConfig {
    /// Time-to-live of the cached ranked id list.
    pub ids_ttl: Duration,
    /// Time-to-live of each cached item record.
    pub item_ttl: Duration,
    /// Item fetches allowed in flight per CPU core, process-wide.
    pub item_fetches_per_core: usize,
    /// Largest count a caller may request.
    pub max_n: usize,
    /// Count used when the caller does not specify one.
    pub default_n: usize,
    /// Size of the process-wide outbound call budget.
    pub request_budget: usize,
}

impl Default for BestStoriesConfig {
    fn default() -> Self {
        Self {
            ids_ttl: Duration::from_secs(1),
            item_ttl: Duration::from_secs(600),
            item_fetches_per_core: 10,
            max_n: 1000,
            default_n: 10,
            request_budget: 1000,
        }
    }
}

impl BestStoriesConfig {
    /// Process-wide item fetch limit for a host with `cores` CPU cores.
    #[must_use]
    pub fn item_fetch_limit(&self, cores: usize) -> usize {
        cores.max(1).saturating_mul(self.item_fetches_per_core).max(1)
    }
}
