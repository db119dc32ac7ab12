use axum::extract::{Path, State};
use axum::{Extension, Json};
use feed_core::clock::now_millis;
use feed_core::feed::Thread;
use feed_core::wire::{CloseTask, ResolveTask, ResolvedTask};

use crate::error::AppError;
use crate::principal::Principal;
use crate::state::AppState;

/// GET /api/v1/feed/tasks/{id}
pub async fn get_task(
    State(app): State<AppState>,
    Path(task_id): Path<u64>,
) -> Result<Json<Thread>, AppError> {
    let store = app.store.read().await;
    Ok(Json(store.task(task_id)?.clone()))
}

/// PUT /api/v1/feed/tasks/{id}/resolve: accept the suggestion and merge it.
pub async fn resolve_task(
    State(app): State<AppState>,
    Path(task_id): Path<u64>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ResolveTask>,
) -> Result<Json<ResolvedTask>, AppError> {
    let mut store = app.store.write().await;
    let actor = store.actor(principal.name());
    let resolved = store.resolve_task(task_id, &actor, &*app.gate, body.new_value, now_millis())?;
    tracing::info!(
        task_id,
        user = %principal.name(),
        version = resolved.entity.version,
        "task resolved"
    );
    Ok(Json(resolved))
}

/// PUT /api/v1/feed/tasks/{id}/close: close with a comment, rejecting the
/// suggestion.
pub async fn close_task(
    State(app): State<AppState>,
    Path(task_id): Path<u64>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CloseTask>,
) -> Result<Json<Thread>, AppError> {
    let mut store = app.store.write().await;
    let actor = store.actor(principal.name());
    let thread = store.close_task(task_id, &actor, &*app.gate, &body.comment, now_millis())?;
    tracing::info!(task_id, user = %principal.name(), "task closed");
    Ok(Json(thread))
}
