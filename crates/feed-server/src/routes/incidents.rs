use axum::extract::{Path, RawQuery, State};
use axum::{Extension, Json};
use feed_core::clock::now_millis;
use feed_core::filter::ListQuery;
use feed_core::incident::{IncidentPage, ResolutionStatus};
use feed_core::patch::PatchOp;
use uuid::Uuid;

use crate::error::AppError;
use crate::principal::Principal;
use crate::state::AppState;

/// GET /api/v1/dataQuality/testCases/testCaseIncidentStatus
///
/// The query string is the incident filter plus `limit`, `latest`, `offset`,
/// `before` and `after`. A missing range defaults to the last 30 days.
pub async fn list_incidents(
    State(app): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Json<IncidentPage>, AppError> {
    let query = ListQuery::from_query(raw.as_deref().unwrap_or(""), now_millis(), app.page_size)?;
    let store = app.store.read().await;
    Ok(Json(store.list_incidents(&query)?))
}

/// PATCH /api/v1/dataQuality/testCases/testCaseIncidentStatus/{id}
pub async fn patch_incident(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(principal): Extension<Principal>,
    Json(ops): Json<Vec<PatchOp>>,
) -> Result<Json<ResolutionStatus>, AppError> {
    let mut store = app.store.write().await;
    let actor = store.actor(principal.name());
    let record = store.patch_incident(id, &ops, &actor, &*app.gate, now_millis())?;
    tracing::info!(incident = %id, user = %principal.name(), ops = ops.len(), "incident patched");
    Ok(Json(record))
}
