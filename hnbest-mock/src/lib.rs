//! hnbest-mock
//!
//! Transports for tests that never touch the network.
//!
//! - [`MockTransport`] serves a fixed set of fixture stories.
//! - [`DynamicMockTransport`] defers every response to a
//!   [`DynamicMockController`] so tests can script failures, stalls and
//!   per-path sequences.
use std::collections::HashMap;

use async_trait::async_trait;
use hnbest_core::{
    HnError, ItemId, Resource, Transport, UpstreamItem, UpstreamRequest, UpstreamResponse,
};

mod dynamic;
mod fixtures;

pub use dynamic::{DynamicMockController, DynamicMockTransport, MockBehavior, story};

/// Mock transport for CI-safe tests. Serves deterministic data from static fixtures.
///
/// Unknown items answer `200 null`, the same way the live API does.
/// The path `item/500.json` always answers 500 and `item/404.json` answers 404.
pub struct MockTransport {
    ids: Vec<ItemId>,
    items: HashMap<ItemId, UpstreamItem>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Transport serving the built-in fixture stories.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: fixtures::stories::BEST_IDS.to_vec(),
            items: fixtures::stories::items()
                .into_iter()
                .map(|i| (i.id, i))
                .collect(),
        }
    }

    /// The fixture ranked id list.
    #[must_use]
    pub fn best_ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// The fixture record for `id`, if any.
    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&UpstreamItem> {
        self.items.get(&id)
    }

    fn respond(&self, path: &str) -> UpstreamResponse {
        if path == Resource::BestStories.path() {
            return UpstreamResponse::json_body(200, &serde_json::json!(self.ids));
        }
        let Some(id) = parse_item_path(path) else {
            return UpstreamResponse::new(404, "null");
        };
        match id {
            404 => UpstreamResponse::new(404, "null"),
            500 => UpstreamResponse::new(500, "internal error"),
            _ => match self.items.get(&id) {
                Some(item) => {
                    UpstreamResponse::json_body(200, &serde_json::to_value(item).unwrap_or_default())
                }
                None => UpstreamResponse::new(200, "null"),
            },
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        "hnbest-mock"
    }

    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        Ok(self.respond(req.path()))
    }
}

/// Extract the id from `item/{id}.json`.
pub(crate) fn parse_item_path(path: &str) -> Option<ItemId> {
    path.strip_prefix("item/")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}
