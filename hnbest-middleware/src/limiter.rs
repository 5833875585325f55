//! Bounded-concurrency limiter with a bounded FIFO wait queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use hnbest_core::{HnError, Middleware, Transport, UpstreamRequest, UpstreamResponse};
use hnbest_types::ConcurrencyLimitConfig;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// At most `permit_limit` holders at once and at most `queue_limit` callers
/// waiting for a permit. Waiters are served in arrival order; a caller that
/// would overflow the queue is rejected immediately.
///
/// Admission is counted once for holders and waiters together, so a permit
/// handed from a releasing holder to the next waiter never makes the queue
/// look full to a new caller.
#[derive(Debug)]
pub struct PermitQueue {
    semaphore: Arc<Semaphore>,
    admitted: Arc<AtomicUsize>,
    permit_limit: usize,
    queue_limit: usize,
}

impl PermitQueue {
    /// Create a queue from limiter settings. A zero permit limit is raised to one.
    #[must_use]
    pub fn new(config: ConcurrencyLimitConfig) -> Self {
        let permit_limit = config.permit_limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permit_limit)),
            admitted: Arc::new(AtomicUsize::new(0)),
            permit_limit,
            queue_limit: config.queue_limit,
        }
    }

    /// Take a permit, waiting in line if none is free.
    ///
    /// The permit is released when the returned value is dropped.
    ///
    /// # Errors
    /// Returns `HnError::CapacityExceeded` when every permit is taken and the
    /// wait queue is already full.
    pub async fn acquire(&self) -> Result<LimiterPermit, HnError> {
        let capacity = self.permit_limit.saturating_add(self.queue_limit);
        if self.admitted.fetch_add(1, Ordering::SeqCst) >= capacity {
            self.admitted.fetch_sub(1, Ordering::SeqCst);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                permit_limit = self.permit_limit,
                queue_limit = self.queue_limit,
                "limiter queue full, rejecting"
            );
            return Err(self.rejection());
        }
        // Released on success and on cancellation alike.
        let admission = Admission(Arc::clone(&self.admitted));

        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| HnError::Other("limiter closed".to_string()))?;
        Ok(LimiterPermit {
            _admission: admission,
            _permit: permit,
        })
    }

    /// Permits currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.permit_limit
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Callers currently waiting for a permit.
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.admitted
            .load(Ordering::SeqCst)
            .saturating_sub(self.in_use())
    }

    const fn rejection(&self) -> HnError {
        HnError::CapacityExceeded {
            permit_limit: self.permit_limit,
            queue_limit: self.queue_limit,
        }
    }
}

#[derive(Debug)]
struct Admission(Arc<AtomicUsize>);

impl Drop for Admission {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A held [`PermitQueue`] permit. Dropping it frees the permit and the
/// admission slot.
#[derive(Debug)]
pub struct LimiterPermit {
    // Fields drop in order: the admission slot is freed before the permit moves on.
    _admission: Admission,
    _permit: OwnedSemaphorePermit,
}

/// Transport wrapper that runs each call under a [`PermitQueue`] permit.
pub struct ConcurrencyLimitedTransport {
    inner: Arc<dyn Transport>,
    queue: PermitQueue,
}

impl ConcurrencyLimitedTransport {
    /// Wrap `inner` with the given limiter settings.
    #[must_use]
    pub fn new(inner: Arc<dyn Transport>, config: ConcurrencyLimitConfig) -> Self {
        Self {
            inner,
            queue: PermitQueue::new(config),
        }
    }

    /// The underlying permit queue.
    #[must_use]
    pub const fn queue(&self) -> &PermitQueue {
        &self.queue
    }
}

#[async_trait]
impl Transport for ConcurrencyLimitedTransport {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        let _permit = self.queue.acquire().await?;
        self.inner.send(req).await
    }
}

/// Middleware config for constructing a [`ConcurrencyLimitedTransport`].
pub struct ConcurrencyLimitMiddleware {
    pub config: ConcurrencyLimitConfig,
}

impl ConcurrencyLimitMiddleware {
    #[must_use]
    pub const fn new(config: ConcurrencyLimitConfig) -> Self {
        Self { config }
    }
}

impl Middleware for ConcurrencyLimitMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        Arc::new(ConcurrencyLimitedTransport::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "ConcurrencyLimitedTransport"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({
            "permit_limit": self.config.permit_limit,
            "queue_limit": self.config.queue_limit,
        })
    }
}
