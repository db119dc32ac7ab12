use axum::extract::{Query, State};
use axum::Json;
use feed_core::wire::{SearchIndex, SearchResults};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub index: String,
}

/// GET /api/v1/search/query?q=&index=
///
/// Backs the assignee and test case pickers.
pub async fn search(
    State(app): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    let index: SearchIndex = params.index.parse()?;
    let store = app.store.read().await;
    Ok(Json(SearchResults {
        hits: store.search(&params.q, index),
    }))
}
