//! HTTP front end for the hnbest orchestrator.
//!
//! - `GET /api/beststories?n=<count>`: top stories by score.
//! - `GET /health`: liveness and version.
//!
//! [`router`] builds the full application so tests drive the same stack that
//! `main` serves.

pub mod config;
pub mod error;
pub mod limiter;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with all layers applied.
pub fn router(state: AppState) -> Router {
    let api = routes::stories::router().route_layer(middleware::from_fn_with_state(
        Arc::clone(&state.clients),
        limiter::limit_per_client,
    ));

    Router::new()
        .merge(routes::health::router())
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
