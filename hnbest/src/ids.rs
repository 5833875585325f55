use std::sync::Arc;
use std::time::Duration;

use hnbest_core::{CoalescingCache, HnError, ItemId, Resource, Transport, UpstreamRequest};

use crate::FetchBudget;

/// Cache key of the ranked id list.
pub const BEST_IDS_KEY: &str = "hn_best_ids";

/// Reads the ranked "best stories" id list through a one-entry cache.
pub struct RankedIdsFetcher {
    transport: Arc<dyn Transport>,
    budget: FetchBudget,
    cache: CoalescingCache<&'static str, Arc<[ItemId]>>,
    ttl: Duration,
}

impl RankedIdsFetcher {
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

    /// The ranked id list, most significant first.
    ///
    /// A non-success status yields an empty list rather than an error.
    ///
    /// # Errors
    /// Transport failures (including local rejections) and bodies that are not
    /// an integer array.
    pub async fn ranked_ids(&self) -> Result<Arc<[ItemId]>, HnError> {
        self.cache
            .get_or_fetch(BEST_IDS_KEY, self.ttl, || self.fetch())
            .await
    }

    /// Drop the cached list so the next call refetches.
    pub fn invalidate(&self) {
        self.cache.invalidate(&BEST_IDS_KEY);
    }

    async fn fetch(&self) -> Result<Arc<[ItemId]>, HnError> {
        let _permit = self.budget.acquire().await?;
        let resp = self
            .transport
            .send(&UpstreamRequest::resource(Resource::BestStories))
            .await?;
        if !resp.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(status = resp.status, "ranked list unavailable, serving empty list");
            return Ok(Arc::from(Vec::new()));
        }
        let ids: Option<Vec<ItemId>> = resp.json()?;
        Ok(Arc::from(ids.unwrap_or_default()))
    }
}
