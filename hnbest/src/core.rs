use std::sync::Arc;

use futures::future::join_all;
use hnbest_core::{
    BestStoriesConfig, HnError, ItemId, PublicStoryView, Transport, TransportConfig,
    UpstreamItem, sort_by_score_desc,
};
use hnbest_middleware::TransportBuilder;
use tokio::sync::Semaphore;

use crate::{FetchBudget, ItemFetcher, RankedIdsFetcher, check_count};

/// Orchestrator for top-N best-stories requests.
///
/// Owns the two caches, the fetch budget and the item dispatch limit. Build one
/// per process and share it behind an `Arc`.
pub struct BestStories {
    ids: RankedIdsFetcher,
    items: ItemFetcher,
    dispatch: Arc<Semaphore>,
    budget: FetchBudget,
    cfg: BestStoriesConfig,
}

/// Builder for constructing a [`BestStories`] orchestrator.
pub struct BestStoriesBuilder {
    transport: Option<Arc<dyn Transport>>,
    cfg: BestStoriesConfig,
    cores: Option<usize>,
}

impl Default for BestStoriesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BestStoriesBuilder {
    /// Create a new builder with the default configuration and no transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            transport: None,
            cfg: BestStoriesConfig::default(),
            cores: None,
        }
    }

    /// Transport every upstream call goes through. It is used as given, so wrap
    /// it with the resilience layers first (see [`resilient_transport`](Self::resilient_transport)).
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Wrap `raw` in the standard limiter, retry and breaker stack and use it.
    #[must_use]
    pub fn resilient_transport(self, raw: Arc<dyn Transport>, cfg: &TransportConfig) -> Self {
        self.transport(TransportBuilder::resilient(raw, cfg).build())
    }

    /// Replace the whole configuration.
    #[must_use]
    pub const fn config(mut self, cfg: BestStoriesConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Time-to-live of the cached ranked list.
    #[must_use]
    pub const fn ids_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.cfg.ids_ttl = ttl;
        self
    }

    /// Time-to-live of each cached item.
    #[must_use]
    pub const fn item_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.cfg.item_ttl = ttl;
        self
    }

    /// Override the detected CPU core count used to size the dispatch limit.
    #[must_use]
    pub const fn cores(mut self, cores: usize) -> Self {
        self.cores = Some(cores);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    /// Returns `HnError::InvalidArg` if no transport was supplied.
    pub fn build(self) -> Result<BestStories, HnError> {
        let transport = self
            .transport
            .ok_or_else(|| HnError::InvalidArg("transport is required".to_string()))?;
        let cores = self.cores.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        });
        let budget = FetchBudget::new(self.cfg.request_budget);
        Ok(BestStories {
            ids: RankedIdsFetcher::new(Arc::clone(&transport), budget.clone(), self.cfg.ids_ttl),
            items: ItemFetcher::new(transport, budget.clone(), self.cfg.item_ttl),
            dispatch: Arc::new(Semaphore::new(self.cfg.item_fetch_limit(cores))),
            budget,
            cfg: self.cfg,
        })
    }
}

impl BestStories {
    /// Start building a new orchestrator.
    #[must_use]
    pub fn builder() -> BestStoriesBuilder {
        BestStoriesBuilder::new()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &BestStoriesConfig {
        &self.cfg
    }

    /// Shared outbound call budget.
    #[must_use]
    pub const fn budget(&self) -> &FetchBudget {
        &self.budget
    }

    /// The (cached) ranked id list.
    ///
    /// # Errors
    /// See [`RankedIdsFetcher::ranked_ids`].
    pub async fn ranked_ids(&self) -> Result<Arc<[ItemId]>, HnError> {
        self.ids.ranked_ids().await
    }

    /// The (cached) record for one item.
    ///
    /// # Errors
    /// See [`ItemFetcher::item`].
    pub async fn item(&self, id: ItemId) -> Result<Option<Arc<UpstreamItem>>, HnError> {
        self.items.item(id).await
    }

    /// The first `n` ranked stories, sorted by score (highest first).
    ///
    /// Behavior and trade-offs:
    /// - `n` outside `[1, max_n]` is rejected before any upstream call.
    /// - Items run concurrently under the dispatch limit. Missing and failed
    ///   items are skipped, so fewer than `n` stories may come back.
    /// - Equal scores keep their ranked-list order.
    ///
    /// # Errors
    /// `HnError::InvalidArg` for an out-of-range `n`, and
    /// `HnError::UpstreamUnavailable` when the ranked list cannot be obtained.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "hnbest::top_n", skip(self))
    )]
    pub async fn top_n(&self, n: usize) -> Result<Vec<PublicStoryView>, HnError> {
        let n = check_count(i64::try_from(n).unwrap_or(i64::MAX), self.cfg.max_n)?;
        let ids = self.ids.ranked_ids().await.map_err(|e| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "ranked list fetch failed");
            HnError::upstream_unavailable(&e)
        })?;

        let take = n.min(ids.len());
        let tasks = ids[..take].iter().map(|&id| self.dispatch_item(id));
        let mut stories: Vec<PublicStoryView> = join_all(tasks)
            .await
            .into_iter()
            .flatten()
            .map(|item| PublicStoryView::from(&*item))
            .collect();

        sort_by_score_desc(&mut stories);
        #[cfg(feature = "tracing")]
        tracing::debug!(requested = n, returned = stories.len(), "top stories ready");
        Ok(stories)
    }

    async fn dispatch_item(&self, id: ItemId) -> Option<Arc<UpstreamItem>> {
        let _permit = self.dispatch.acquire().await.ok()?;
        match self.items.item(id).await {
            Ok(item) => item,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(id, error = %_e, "item fetch failed, dropping");
                None
            }
        }
    }
}
