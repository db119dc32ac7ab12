use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use feed_core::clock::now_millis;
use feed_core::entity_link::EntityLink;
use feed_core::feed::Thread;
use feed_core::incident::Paging;
use feed_core::patch::PatchOp;
use feed_core::task::TaskCount;
use feed_core::wire::{CreateThread, FeedQuery, PostBody, ThreadList};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::principal::Principal;
use crate::state::AppState;

/// GET /api/v1/feed: threads matching the query, newest first.
pub async fn list_threads(
    State(app): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<ThreadList>, AppError> {
    let store = app.store.read().await;
    let data = store.list_threads(&query)?;
    let total = data.len();
    Ok(Json(ThreadList {
        data,
        paging: Paging {
            before: None,
            after: None,
            total,
        },
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountQuery {
    pub entity_link: Option<String>,
}

/// GET /api/v1/feed/count: open and closed task counts.
pub async fn count_tasks(
    State(app): State<AppState>,
    Query(query): Query<CountQuery>,
) -> Result<Json<TaskCount>, AppError> {
    let link = query
        .entity_link
        .as_deref()
        .map(EntityLink::parse)
        .transpose()?;
    let store = app.store.read().await;
    Ok(Json(store.count(link.as_ref())))
}

/// POST /api/v1/feed: start a conversation or create a task.
pub async fn create_thread(
    State(app): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<CreateThread>,
) -> Result<(StatusCode, Json<Thread>), AppError> {
    let mut store = app.store.write().await;
    let thread = store.create_thread(body, principal.name(), now_millis())?;
    match &thread.task {
        Some(task) => tracing::info!(task_id = task.id, user = %principal.name(), "task created"),
        None => tracing::info!(thread = %thread.id, user = %principal.name(), "thread created"),
    }
    Ok((StatusCode::CREATED, Json(thread)))
}

/// GET /api/v1/feed/{id}
pub async fn get_thread(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Thread>, AppError> {
    let store = app.store.read().await;
    Ok(Json(store.thread(id)?.clone()))
}

/// PATCH /api/v1/feed/{id}: JSON patch limited to the caller's reactions.
pub async fn patch_thread(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(principal): Extension<Principal>,
    Json(ops): Json<Vec<PatchOp>>,
) -> Result<Json<Thread>, AppError> {
    let mut store = app.store.write().await;
    let actor = store.actor(principal.name());
    let thread = store.patch_thread(id, &ops, &actor, now_millis())?;
    Ok(Json(thread))
}

/// POST /api/v1/feed/{id}/posts: reply to a thread.
pub async fn add_post(
    State(app): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<PostBody>,
) -> Result<Json<Thread>, AppError> {
    let mut store = app.store.write().await;
    let thread = store.add_post(id, principal.name(), &body.message, now_millis())?;
    Ok(Json(thread))
}

/// DELETE /api/v1/feed/{id}/posts/{post_id}
pub async fn delete_post(
    State(app): State<AppState>,
    Path((id, post_id)): Path<(Uuid, Uuid)>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Thread>, AppError> {
    let mut store = app.store.write().await;
    let thread = store.delete_post(id, post_id, principal.name())?;
    Ok(Json(thread))
}
