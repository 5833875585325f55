use std::sync::Arc;

use hnbest_core::HnError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Process-wide cap on outstanding upstream calls.
///
/// Cloning shares the same pool. The size is fixed at construction.
#[derive(Debug, Clone)]
pub struct FetchBudget {
    permits: Arc<Semaphore>,
    size: usize,
}

impl FetchBudget {
    /// Pool of `size` permits (at least one).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Wait for a permit; it is returned to the pool on drop.
    ///
    /// # Errors
    /// Returns `HnError::Other` only if the pool has been closed, which this
    /// type never does.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, HnError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| HnError::Other("fetch budget closed".to_string()))
    }

    /// Configured pool size.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
