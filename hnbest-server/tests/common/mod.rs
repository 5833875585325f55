use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, Response};
use hnbest::{BestStories, ConcurrencyLimitConfig, RetryConfig, TransportConfig};
use hnbest_mock::{DynamicMockController, DynamicMockTransport};
use hnbest_server::router;
use hnbest_server::state::AppState;
use tower::ServiceExt;

/// Build the full application over a scripted upstream.
pub fn build_test_app(client_limit: ConcurrencyLimitConfig) -> (Router, DynamicMockController) {
    let (raw, controller) = DynamicMockTransport::new_with_controller("hn-mock");
    let transport = TransportConfig {
        retry: RetryConfig {
            max_retries: 1,
            min_backoff_ms: 1,
            max_backoff_ms: 5,
            ..RetryConfig::default()
        },
        ..TransportConfig::default()
    };
    let stories = BestStories::builder()
        .resilient_transport(raw, &transport)
        .cores(2)
        .build()
        .expect("orchestrator");
    let state = AppState::new(Arc::new(stories), client_limit);
    (router(state), controller)
}

pub fn default_limit() -> ConcurrencyLimitConfig {
    ConcurrencyLimitConfig {
        permit_limit: 10,
        queue_limit: 100,
    }
}

/// Issue a GET as if it came from `peer`.
pub async fn get_from(app: Router, uri: &str, peer: SocketAddr) -> Response<Body> {
    let mut req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    req.extensions_mut().insert(ConnectInfo(peer));
    app.oneshot(req).await.unwrap()
}

/// Issue a GET from a non-loopback client.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    get_from(app, uri, "203.0.113.7:40000".parse().unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
