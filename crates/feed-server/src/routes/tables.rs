use axum::extract::{Path, State};
use axum::Json;
use feed_core::entity::CatalogEntity;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/v1/tables/name/{fqn}
pub async fn get_table(
    State(app): State<AppState>,
    Path(fqn): Path<String>,
) -> Result<Json<CatalogEntity>, AppError> {
    let store = app.store.read().await;
    Ok(Json(store.entity(&fqn)?.clone()))
}
