mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, default_limit, get, get_from};
use hnbest::{ConcurrencyLimitConfig, HnError, UpstreamItem};
use hnbest_core::UpstreamResponse;
use hnbest_mock::MockBehavior;

#[tokio::test]
async fn health_reports_ok_and_version() {
    let (app, _) = build_test_app(default_limit());
    let response = get(app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn default_count_returns_sorted_camel_case_stories() {
    let (app, controller) = build_test_app(default_limit());
    let stories: Vec<(u64, i64)> = (1..=12).map(|id| (id, (id as i64 * 7) % 50)).collect();
    controller.with_stories(&stories).await;

    let response = get(app, "/api/beststories").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 10);
    let scores: Vec<i64> = arr.iter().map(|s| s["score"].as_i64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");

    let first = &arr[0];
    for key in ["title", "uri", "postedBy", "time", "score", "commentCount"] {
        assert!(first.get(key).is_some(), "missing {key}");
    }
    assert_eq!(controller.calls("item/11.json").await, 0, "only the first 10 ids");
}

#[tokio::test]
async fn story_fields_render_as_documented() {
    let (app, controller) = build_test_app(default_limit());
    controller.set_best_ids(&[8863]).await;
    controller
        .set_item(&UpstreamItem {
            id: 8863,
            by: "dhouston".into(),
            score: 111,
            time: 1_175_714_200,
            title: Some("My YC app: Dropbox - Throw away your USB drive".into()),
            url: None,
            kids: Some(vec![8952, 9224, 8917]),
            kind: Some("story".into()),
        })
        .await;

    let json = body_json(get(app, "/api/beststories?n=1").await).await;
    assert_eq!(
        json,
        serde_json::json!([{
            "title": "My YC app: Dropbox - Throw away your USB drive",
            "postedBy": "dhouston",
            "time": "2007-04-04T19:16:40+00:00",
            "score": 111,
            "commentCount": 3
        }])
    );
}

#[tokio::test]
async fn invalid_counts_are_rejected_before_upstream() {
    let (app, controller) = build_test_app(default_limit());
    controller.with_stories(&[(1, 1)]).await;

    for q in ["0", "-1", "abc", "1.5"] {
        let response = get(app.clone(), &format!("/api/beststories?n={q}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "n={q}");
        assert_eq!(
            body_json(response).await["error"],
            "Parameter 'n' must be a positive integer."
        );
    }

    let response = get(app, "/api/beststories?n=1001").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Parameter 'n' must be <= 1000."
    );
    assert_eq!(controller.total_calls().await, 0);
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let (app, controller) = build_test_app(default_limit());
    controller
        .set_behavior(
            "beststories.json",
            MockBehavior::Fail(HnError::connection("hn-mock", "refused")),
        )
        .await;

    let response = get(app, "/api/beststories?n=3").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let msg = body_json(response).await["error"].as_str().unwrap().to_string();
    assert!(msg.starts_with("upstream unavailable"), "{msg}");
}

#[tokio::test(start_paused = true)]
async fn per_client_limit_rejects_excess_and_exempts_loopback() {
    let (app, controller) = build_test_app(ConcurrencyLimitConfig {
        permit_limit: 1,
        queue_limit: 0,
    });
    controller.with_stories(&[(1, 1)]).await;
    controller
        .set_behavior(
            "beststories.json",
            MockBehavior::Delayed(
                Duration::from_millis(50),
                UpstreamResponse::json_body(200, &serde_json::json!([1])),
            ),
        )
        .await;

    let remote = "198.51.100.1:5000".parse().unwrap();
    let slow = tokio::spawn(get_from(app.clone(), "/api/beststories?n=1", remote));
    tokio::time::sleep(Duration::from_millis(1)).await;

    let rejected = get_from(app.clone(), "/api/beststories?n=1", remote).await;
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body_json(rejected).await["error"],
        "Too many concurrent requests."
    );

    let other = "198.51.100.2:5000".parse().unwrap();
    let loopback = "127.0.0.1:5000".parse().unwrap();
    let (a, b) = tokio::join!(
        get_from(app.clone(), "/api/beststories?n=1", other),
        get_from(app.clone(), "/api/beststories?n=1", loopback),
    );
    assert_eq!(a.status(), StatusCode::OK, "other clients have their own allowance");
    assert_eq!(b.status(), StatusCode::OK, "loopback is exempt");
    assert_eq!(slow.await.unwrap().status(), StatusCode::OK);

    let again = get_from(app, "/api/beststories?n=1", remote).await;
    assert_eq!(again.status(), StatusCode::OK, "allowance returns after completion");
}
