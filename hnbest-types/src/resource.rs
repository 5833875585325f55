use core::fmt;
use serde::{Deserialize, Serialize};

use crate::ItemId;

/// Upstream resources the orchestrator reads.
///
/// Used to build request paths and to label errors and telemetry consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Resource {
    /// The ranked "best stories" identifier list.
    BestStories,
    /// A single item record.
    Item(ItemId),
}

impl Resource {
    /// Path relative to the upstream base URL.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::BestStories => "beststories.json".to_string(),
            Self::Item(id) => format!("item/{id}.json"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BestStories => f.write_str("beststories"),
            Self::Item(id) => write!(f, "item/{id}"),
        }
    }
}
