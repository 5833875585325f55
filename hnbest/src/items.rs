use std::sync::Arc;
use std::time::Duration;

use hnbest_core::{
    CoalescingCache, HnError, ItemId, Resource, Transport, UpstreamItem, UpstreamRequest,
};

use crate::FetchBudget;

/// Reads single item records through a per-id cache.
///
/// Absent items are cached like values: a 404 or a `null` body settles to
/// `None` for the full TTL.
pub struct ItemFetcher {
    transport: Arc<dyn Transport>,
    budget: FetchBudget,
    cache: CoalescingCache<ItemId, Option<Arc<UpstreamItem>>>,
    ttl: Duration,
}

impl ItemFetcher {
    /// Fetcher over `transport` drawing permits from `budget`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, budget: FetchBudget, ttl: Duration) -> Self {
        Self {
            transport,
            budget,
            cache: CoalescingCache::new(),
            ttl,
        }
    }

    /// The record for `id`, or `None` if the upstream has no such item.
    ///
    /// # Errors
    /// Transport failures, non-success statuses other than 404
    /// (`HnError::UpstreamStatus`), and bodies that do not decode.
    pub async fn item(&self, id: ItemId) -> Result<Option<Arc<UpstreamItem>>, HnError> {
        self.cache
            .get_or_fetch(id, self.ttl, || self.fetch(id))
            .await
    }

    /// Number of cached (or in-flight) item entries.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    async fn fetch(&self, id: ItemId) -> Result<Option<Arc<UpstreamItem>>, HnError> {
        let _permit = self.budget.acquire().await?;
        let resource = Resource::Item(id);
        let resp = self
            .transport
            .send(&UpstreamRequest::resource(resource))
            .await?;
        if resp.is_not_found() {
            return Ok(None);
        }
        if !resp.is_success() {
            return Err(HnError::upstream_status(resp.status, resource.to_string()));
        }
        let item: Option<UpstreamItem> = resp.json()?;
        Ok(item.map(Arc::new))
    }
}
