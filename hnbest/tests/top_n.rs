use std::sync::Arc;
use std::time::Duration;

use hnbest::{BestStories, BestStoriesConfig, HnError, RetryConfig, TransportConfig};
use hnbest_core::{Transport, UpstreamResponse};
use hnbest_mock::{DynamicMockController, DynamicMockTransport, MockBehavior, story};

fn fast_transport() -> TransportConfig {
    TransportConfig {
        retry: RetryConfig {
            max_retries: 2,
            min_backoff_ms: 5,
            max_backoff_ms: 20,
            ..RetryConfig::default()
        },
        ..TransportConfig::default()
    }
}

fn orchestrator(raw: Arc<dyn Transport>) -> BestStories {
    BestStories::builder()
        .resilient_transport(raw, &fast_transport())
        .cores(2)
        .build()
        .expect("orchestrator")
}

fn mock() -> (Arc<dyn Transport>, DynamicMockController) {
    DynamicMockTransport::new_with_controller("hn-mock")
}

#[tokio::test(start_paused = true)]
async fn missing_and_failing_items_are_dropped() {
    let (raw, controller) = mock();
    controller.set_best_ids(&[1, 2, 3, 4, 5]).await;
    controller.set_item(&story(1, 10)).await;
    controller.set_item(&story(2, 30)).await;
    controller.set_behavior("item/3.json", MockBehavior::status(404)).await;
    controller.set_item(&story(4, 20)).await;
    controller
        .set_behavior(
            "item/5.json",
            MockBehavior::Fail(HnError::timeout("item/5.json", Duration::from_secs(10))),
        )
        .await;
    let best = orchestrator(raw);

    let top = best.top_n(5).await.expect("partial result is not an error");
    let titles: Vec<_> = top.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["story 2", "story 4", "story 1"]);
    assert_eq!(controller.calls("item/5.json").await, 3, "timeouts are retried");
    assert_eq!(controller.calls("item/3.json").await, 1, "404 is not retried");
}

#[tokio::test(start_paused = true)]
async fn stalled_item_is_cut_off_by_the_deadline_and_dropped() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 10), (2, 20)]).await;
    controller.set_best_ids(&[1, 2, 3]).await;
    controller.set_behavior("item/3.json", MockBehavior::Hang).await;
    let best = orchestrator(raw);

    let started = tokio::time::Instant::now();
    let top = best.top_n(3).await.unwrap();
    let titles: Vec<_> = top.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["story 2", "story 1"]);
    assert_eq!(controller.calls("item/3.json").await, 3, "each attempt timed out");
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn fewer_ids_than_requested_returns_what_exists() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 5), (2, 6)]).await;
    let best = orchestrator(raw);

    let top = best.top_n(10).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].score, 6);
}

#[tokio::test(start_paused = true)]
async fn only_the_first_n_ids_are_fetched() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 1), (2, 2), (3, 3), (4, 4)]).await;
    let best = orchestrator(raw);

    let top = best.top_n(2).await.unwrap();
    assert_eq!(top.iter().map(|s| s.score).collect::<Vec<_>>(), vec![2, 1]);
    assert_eq!(controller.calls("item/3.json").await, 0);
    assert_eq!(controller.calls("item/4.json").await, 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_counts_never_reach_upstream() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 1)]).await;
    let best = orchestrator(raw);

    for n in [0, 1001] {
        assert!(matches!(best.top_n(n).await, Err(HnError::InvalidArg(_))));
    }
    assert_eq!(controller.total_calls().await, 0);
}

#[tokio::test(start_paused = true)]
async fn ranked_list_failure_is_upstream_unavailable() {
    let (raw, controller) = mock();
    controller
        .set_behavior(
            "beststories.json",
            MockBehavior::Fail(HnError::connection("hn-mock", "refused")),
        )
        .await;
    let best = orchestrator(raw);

    let err = best.top_n(5).await.unwrap_err();
    assert!(matches!(err, HnError::UpstreamUnavailable { .. }), "{err:?}");

    // Not cached: the next request tries again.
    let before = controller.calls("beststories.json").await;
    let _ = best.top_n(5).await;
    assert!(controller.calls("beststories.json").await > before);
}

#[tokio::test(start_paused = true)]
async fn ranked_list_error_status_is_an_empty_result() {
    let (raw, controller) = mock();
    controller
        .set_behavior("beststories.json", MockBehavior::status(403))
        .await;
    let best = orchestrator(raw);

    assert!(best.top_n(5).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn null_item_body_counts_as_missing() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 1), (2, 2)]).await;
    controller
        .set_behavior(
            "item/2.json",
            MockBehavior::Respond(UpstreamResponse::new(200, "null")),
        )
        .await;
    let best = orchestrator(raw);

    let top = best.top_n(2).await.unwrap();
    assert_eq!(top.len(), 1);
    assert!(best.item(2).await.unwrap().is_none());
    assert_eq!(controller.calls("item/2.json").await, 1, "absent items are cached");
}

#[tokio::test(start_paused = true)]
async fn caches_follow_their_ttls() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 1), (2, 2)]).await;
    let best = orchestrator(raw);

    best.top_n(2).await.unwrap();
    best.top_n(2).await.unwrap();
    assert_eq!(controller.calls("beststories.json").await, 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    best.top_n(2).await.unwrap();
    assert_eq!(controller.calls("beststories.json").await, 2, "ids ttl is 1s");
    assert_eq!(controller.calls("item/1.json").await, 1, "items live for 600s");

    tokio::time::advance(Duration::from_secs(600)).await;
    best.top_n(2).await.unwrap();
    assert_eq!(controller.calls("item/1.json").await, 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_upstream_calls() {
    let (raw, controller) = mock();
    controller.with_stories(&[(1, 1), (2, 2), (3, 3)]).await;
    controller
        .set_behavior(
            "beststories.json",
            MockBehavior::Delayed(
                Duration::from_millis(20),
                UpstreamResponse::json_body(200, &serde_json::json!([1, 2, 3])),
            ),
        )
        .await;
    let best = Arc::new(orchestrator(raw));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let best = Arc::clone(&best);
            tokio::spawn(async move { best.top_n(3).await })
        })
        .collect();
    for h in handles {
        assert_eq!(h.await.unwrap().unwrap().len(), 3);
    }
    assert_eq!(controller.calls("beststories.json").await, 1);
    for id in 1..=3 {
        assert_eq!(controller.calls(&format!("item/{id}.json")).await, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn item_dispatch_is_bounded_by_cores() {
    let (raw, controller) = mock();
    let ids: Vec<u64> = (1..=20).collect();
    controller.set_best_ids(&ids).await;
    for id in &ids {
        let body = serde_json::to_value(story(*id, 1)).unwrap();
        controller
            .set_behavior(
                format!("item/{id}.json"),
                MockBehavior::Delayed(
                    Duration::from_millis(10),
                    UpstreamResponse::json_body(200, &body),
                ),
            )
            .await;
    }
    let best = BestStories::builder()
        .transport(raw)
        .config(BestStoriesConfig {
            item_fetches_per_core: 2,
            ..BestStoriesConfig::default()
        })
        .cores(2)
        .build()
        .unwrap();

    assert_eq!(best.top_n(20).await.unwrap().len(), 20);
    assert!(controller.peak_in_flight() <= 4, "peak {}", controller.peak_in_flight());
    assert_eq!(best.budget().available(), best.budget().size());
}

#[test]
fn builder_requires_a_transport() {
    assert!(matches!(
        BestStories::builder().build(),
        Err(HnError::InvalidArg(_))
    ));
}
