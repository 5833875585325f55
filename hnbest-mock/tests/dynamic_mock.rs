use std::time::Duration;

use hnbest_core::{HnError, Resource, Transport, UpstreamRequest};
use hnbest_mock::{DynamicMockTransport, MockBehavior, MockTransport};

fn item(id: u64) -> UpstreamRequest {
    UpstreamRequest::resource(Resource::Item(id))
}

#[tokio::test]
async fn test_script_steps_then_repeats_last() {
    let (mock, controller) = DynamicMockTransport::new_with_controller("P0");
    controller
        .set_script(
            "item/1.json",
            vec![MockBehavior::status(503), MockBehavior::status(200)],
        )
        .await;

    let statuses: Vec<u16> = send_n(&*mock, &item(1), 3).await;
    assert_eq!(statuses, vec![503, 200, 200]);
    assert_eq!(controller.calls("item/1.json").await, 3);
}

async fn send_n(mock: &dyn Transport, req: &UpstreamRequest, n: usize) -> Vec<u16> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(mock.send(req).await.expect("response").status);
    }
    out
}

#[tokio::test]
async fn test_fail_and_unconfigured_paths() {
    let (mock, controller) = DynamicMockTransport::new_with_controller("P0");
    let err = HnError::connection("P0", "refused");
    controller
        .set_behavior("item/2.json", MockBehavior::Fail(err.clone()))
        .await;

    assert_eq!(mock.send(&item(2)).await.expect_err("err"), err);
    assert_eq!(mock.send(&item(3)).await.expect("resp").status, 404);
    assert_eq!(controller.total_calls().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_hang_never_completes() {
    let (mock, controller) = DynamicMockTransport::new_with_controller("P0");
    controller.set_behavior("item/9.json", MockBehavior::Hang).await;

    let res = tokio::time::timeout(Duration::from_secs(5), mock.send(&item(9))).await;
    assert!(res.is_err(), "hang must outlive the timeout");
}

#[tokio::test(start_paused = true)]
async fn test_peak_in_flight_is_tracked() {
    let (mock, controller) = DynamicMockTransport::new_with_controller("P0");
    controller
        .set_behavior(
            "item/1.json",
            MockBehavior::Delayed(
                Duration::from_millis(10),
                hnbest_core::UpstreamResponse::new(200, "null"),
            ),
        )
        .await;

    let req = item(1);
    let (a, b, c) = tokio::join!(mock.send(&req), mock.send(&req), mock.send(&req));
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(controller.peak_in_flight(), 3);
}

#[tokio::test]
async fn test_with_stories_serves_ids_and_items() {
    let (mock, controller) = DynamicMockTransport::new_with_controller("P0");
    controller.with_stories(&[(7, 70), (8, 80)]).await;

    let ids: Vec<u64> = mock
        .send(&UpstreamRequest::resource(Resource::BestStories))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(ids, vec![7, 8]);

    let rec: hnbest_core::UpstreamItem = mock.send(&item(8)).await.unwrap().json().unwrap();
    assert_eq!(rec.score, 80);
}

#[tokio::test]
async fn test_static_fixtures() {
    let mock = MockTransport::new();
    let ids: Vec<u64> = mock
        .send(&UpstreamRequest::resource(Resource::BestStories))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(ids, mock.best_ids());

    let missing = mock.send(&item(9_999_999)).await.unwrap();
    assert_eq!((missing.status, missing.body.as_slice()), (200, &b"null"[..]));
    assert_eq!(mock.send(&item(500)).await.unwrap().status, 500);
    assert_eq!(mock.item(8863).map(|i| i.score), Some(111));
}
