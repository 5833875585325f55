use axum::extract::{Query, State};
use axum::{Json, Router, routing::get};
use hnbest::{PublicStoryView, parse_count};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

/// `n` is taken as text so that malformed values get the domain error message
/// instead of the extractor's rejection.
#[derive(Debug, Deserialize)]
pub struct BestStoriesQuery {
    pub n: Option<String>,
}

async fn best_stories(
    State(state): State<AppState>,
    Query(query): Query<BestStoriesQuery>,
) -> Result<Json<Vec<PublicStoryView>>, ApiError> {
    let cfg = state.stories.config();
    let n = parse_count(query.n.as_deref(), cfg.default_n, cfg.max_n)?;
    let stories = state.stories.top_n(n).await?;
    Ok(Json(stories))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/beststories", get(best_stories))
}
