//! Per-client inbound concurrency limiter.
//!
//! Each remote IP gets its own [`PermitQueue`]. Loopback clients bypass the
//! limiter, and requests without a known peer address share one partition.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hnbest::ConcurrencyLimitConfig;
use hnbest_middleware::PermitQueue;

use crate::error::ApiError;

type Partition = Option<IpAddr>;

/// Permit queues keyed by client address. Idle partitions are dropped.
pub struct ClientLimiter {
    config: ConcurrencyLimitConfig,
    partitions: Mutex<HashMap<Partition, Arc<PermitQueue>>>,
}

impl ClientLimiter {
    /// Limiter giving every client `config.permit_limit` concurrent requests.
    #[must_use]
    pub fn new(config: ConcurrencyLimitConfig) -> Self {
        Self {
            config,
            partitions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of clients currently tracked.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.partitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn partition(&self, key: Partition) -> Arc<PermitQueue> {
        let mut map = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            map.entry(key)
                .or_insert_with(|| Arc::new(PermitQueue::new(self.config))),
        )
    }

    fn release(&self, key: Partition, queue: Arc<PermitQueue>) {
        let mut map = self.partitions.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this caller hold it, with no permits out: nobody else is using it.
        if Arc::strong_count(&queue) == 2 && queue.in_use() == 0 {
            map.remove(&key);
        }
    }
}

/// Axum middleware enforcing [`ClientLimiter`]; rejected requests get 429.
pub async fn limit_per_client(
    State(limiter): State<Arc<ClientLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    if peer.is_some_and(|ip| ip.is_loopback()) {
        return next.run(req).await;
    }

    let queue = limiter.partition(peer);
    let permit = match queue.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            tracing::debug!(client = ?peer, "client concurrency limit reached");
            limiter.release(peer, queue);
            return ApiError::TooManyRequests.into_response();
        }
    };
    let response = next.run(req).await;
    drop(permit);
    limiter.release(peer, queue);
    response
}
