use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use hnbest_core::{
    HnError, ItemId, Resource, Transport, UpstreamItem, UpstreamRequest, UpstreamResponse,
};

/// Instruction for how one call to a path should behave.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Answer with the provided response immediately.
    Respond(UpstreamResponse),
    /// Answer after sleeping for the given duration.
    Delayed(Duration, UpstreamResponse),
    /// Fail immediately with the provided error.
    Fail(HnError),
    /// Hang indefinitely (simulate a stalled upstream).
    Hang,
}

impl MockBehavior {
    /// `200` with a JSON body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self::Respond(UpstreamResponse::json_body(200, value))
    }

    /// Bare status code with an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Respond(UpstreamResponse::new(status, Vec::new()))
    }
}

#[derive(Default)]
struct Script {
    steps: VecDeque<MockBehavior>,
}

impl Script {
    // The last step repeats forever.
    fn next(&mut self) -> Option<MockBehavior> {
        if self.steps.len() > 1 {
            self.steps.pop_front()
        } else {
            self.steps.front().cloned()
        }
    }
}

#[derive(Default)]
struct InternalState {
    scripts: HashMap<String, Script>,
    calls: HashMap<String, usize>,
}

#[derive(Default)]
struct Gauges {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
    gauges: Arc<Gauges>,
}

impl DynamicMockController {
    /// Answer every call to `path` with `behavior`.
    pub async fn set_behavior(&self, path: impl Into<String>, behavior: MockBehavior) {
        self.set_script(path, vec![behavior]).await;
    }

    /// Answer successive calls to `path` with `steps` in order; the last step repeats.
    pub async fn set_script(&self, path: impl Into<String>, steps: Vec<MockBehavior>) {
        let mut guard = self.state.lock().await;
        guard.scripts.insert(
            path.into(),
            Script {
                steps: steps.into(),
            },
        );
    }

    /// Serve `ids` as the ranked id list.
    pub async fn set_best_ids(&self, ids: &[ItemId]) {
        self.set_behavior(
            Resource::BestStories.path(),
            MockBehavior::json(&serde_json::json!(ids)),
        )
        .await;
    }

    /// Serve `item` under its own id.
    pub async fn set_item(&self, item: &UpstreamItem) {
        let body = serde_json::to_value(item).unwrap_or_default();
        self.set_behavior(Resource::Item(item.id).path(), MockBehavior::json(&body))
            .await;
    }

    /// Serve a ranked list of `(id, score)` stories in the given order, each with
    /// a title of `story {id}`.
    pub async fn with_stories(&self, stories: &[(ItemId, i64)]) {
        let ids: Vec<ItemId> = stories.iter().map(|(id, _)| *id).collect();
        self.set_best_ids(&ids).await;
        for (id, score) in stories {
            self.set_item(&story(*id, *score)).await;
        }
    }

    /// Number of calls made to `path` so far.
    pub async fn calls(&self, path: &str) -> usize {
        let guard = self.state.lock().await;
        guard.calls.get(path).copied().unwrap_or_default()
    }

    /// Number of calls made to any path so far.
    pub async fn total_calls(&self) -> usize {
        let guard = self.state.lock().await;
        guard.calls.values().sum()
    }

    /// Largest number of calls observed in flight at the same moment.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.gauges.peak.load(Ordering::SeqCst)
    }

    /// Clear all configured behaviors and call counters.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.scripts.clear();
        guard.calls.clear();
        self.gauges.peak.store(0, Ordering::SeqCst);
    }
}

/// Minimal story record used by [`DynamicMockController::with_stories`].
#[must_use]
pub fn story(id: ItemId, score: i64) -> UpstreamItem {
    UpstreamItem {
        id,
        by: format!("user{id}"),
        score,
        time: 1_700_000_000,
        title: Some(format!("story {id}")),
        url: Some(format!("https://example.com/{id}")),
        kids: None,
        kind: Some("story".to_string()),
    }
}

/// A transport that defers all behavior to an external controller.
///
/// Paths with no configured behavior answer `404`.
pub struct DynamicMockTransport {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
    gauges: Arc<Gauges>,
}

impl DynamicMockTransport {
    /// Create a new dynamic mock transport and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn Transport>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let gauges = Arc::new(Gauges::default());
        let controller = DynamicMockController {
            state: Arc::clone(&state),
            gauges: Arc::clone(&gauges),
        };
        let me = Arc::new(Self {
            name,
            state,
            gauges,
        });
        (me as Arc<dyn Transport>, controller)
    }
}

struct InFlight<'a>(&'a Gauges);

impl<'a> InFlight<'a> {
    fn enter(gauges: &'a Gauges) -> Self {
        let now = gauges.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        gauges.peak.fetch_max(now, Ordering::SeqCst);
        Self(gauges)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for DynamicMockTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, req: &UpstreamRequest) -> Result<UpstreamResponse, HnError> {
        let _in_flight = InFlight::enter(&self.gauges);
        // Take the next step without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            *guard.calls.entry(req.path().to_string()).or_default() += 1;
            guard.scripts.get_mut(req.path()).and_then(Script::next)
        };

        match behavior {
            Some(MockBehavior::Respond(resp)) => Ok(resp),
            Some(MockBehavior::Delayed(after, resp)) => {
                tokio::time::sleep(after).await;
                Ok(resp)
            }
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(UpstreamResponse::new(404, "null")),
        }
    }
}
