//! Upstream item record and its public projection.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Upstream item identifier.
pub type ItemId = u64;

/// Partial mapping of an upstream item record.
///
/// Only the fields the service consumes are mapped; unknown fields are ignored.
/// Missing scalars fall back to their zero value so that sparse records (e.g.
/// items whose author account was deleted) still deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamItem {
    /// Item identifier.
    pub id: ItemId,
    /// Author handle.
    #[serde(default)]
    pub by: String,
    /// Score (points).
    #[serde(default)]
    pub score: i64,
    /// Creation time, seconds since the unix epoch (UTC).
    #[serde(default)]
    pub time: i64,
    /// Story title.
    #[serde(default)]
    pub title: Option<String>,
    /// Linked URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Direct child comment identifiers.
    #[serde(default)]
    pub kids: Option<Vec<ItemId>>,
    /// Item type tag ("story", "job", ...).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

/// Externally visible projection of an [`UpstreamItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStoryView {
    /// Title, empty when the upstream record has none.
    pub title: String,
    /// Source URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Author handle, empty when unknown.
    pub posted_by: String,
    /// ISO-8601 timestamp with an explicit `+00:00` offset.
    pub time: String,
    /// Score (points).
    pub score: i64,
    /// Number of direct child comments.
    pub comment_count: usize,
}

impl From<&UpstreamItem> for PublicStoryView {
    fn from(item: &UpstreamItem) -> Self {
        Self {
            title: item.title.clone().unwrap_or_default(),
            uri: item.url.clone(),
            posted_by: item.by.clone(),
            time: unix_to_iso8601(item.time),
            score: item.score,
            comment_count: item.kids.as_ref().map_or(0, Vec::len),
        }
    }
}

/// Render unix seconds as `YYYY-MM-DDTHH:MM:SS+00:00`.
///
/// Out-of-range timestamps render as the epoch.
#[must_use]
pub fn unix_to_iso8601(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_renders_with_explicit_offset() {
        assert_eq!(unix_to_iso8601(0), "1970-01-01T00:00:00+00:00");
        assert_eq!(unix_to_iso8601(1_175_714_200), "2007-04-04T19:16:40+00:00");
    }

    #[test]
    fn out_of_range_time_falls_back_to_epoch() {
        assert_eq!(unix_to_iso8601(i64::MAX), "1970-01-01T00:00:00+00:00");
    }
}
