use axum::http::StatusCode;
use feed_core::clock::now_millis;
use feed_core::entity::TagLabel;
use feed_core::entity_link::EntityLink;
use feed_core::incident::ResolutionStatus;
use feed_core::permission::Denial;
use feed_core::reference::{ActorRef, EntityRef};
use feed_core::suggestion::SuggestedValue;
use feed_core::task::NewTask;
use feed_core::types::{Operation, TaskType};
use feed_core::wire::{CreateThread, PRINCIPAL_HEADER};
use feed_server::{build_router, AppState, Seed};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FQN: &str = "svc.db.schema.orders";

const SEED: &str = r#"
users:
  - { type: user, name: admin }
  - { type: user, name: user1 }
  - { type: user, name: bob }
entities:
  - entityType: table
    name: orders
    fullyQualifiedName: svc.db.schema.orders
    columns:
      - name: id
      - name: details
        children:
          - name: street
policy:
  admins: [admin]
  default_roles: [DataConsumer]
  roles:
    - name: DataConsumer
      policies: [DataConsumerPolicy]
  policies:
    - name: DataConsumerPolicy
      rules:
        - name: viewAndTag
          effect: allow
          operations: [ViewAll, CreateTask, EditTags]
        - name: noDescriptions
          effect: deny
          operations: [EditDescription]
        - name: noTests
          effect: deny
          operations: [EditTests]
"#;

fn seed() -> Seed {
    serde_yaml::from_str(SEED).unwrap()
}

fn app_with(seed: Seed) -> axum::Router {
    build_router(AppState::from_seed(seed))
}

/// Send a request via `oneshot` and return (status, parsed JSON body).
async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = axum::http::Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header(PRINCIPAL_HEADER, user);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => req.body(axum::body::Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: &axum::Router, uri: &str, user: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Some(user), None).await
}

/// Create a task as admin and return its numeric id.
async fn create_task(app: &axum::Router, task_type: TaskType, about: &str, value: SuggestedValue) -> u64 {
    let task = NewTask::new(task_type, about, vec![ActorRef::user("user1")])
        .unwrap()
        .with_suggestion(value)
        .unwrap();
    let body = serde_json::to_value(CreateThread::Task(task)).unwrap();
    let (status, json) = send(app, "POST", "/api/v1/feed", Some("admin"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["task"]["id"].as_u64().unwrap()
}

async fn counts(app: &axum::Router) -> (u64, u64) {
    let (_, json) = get(app, "/api/v1/feed/count", "admin").await;
    (json["open"].as_u64().unwrap(), json["closed"].as_u64().unwrap())
}

fn table_link() -> String {
    EntityLink::table(FQN).to_string()
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_principal_is_401() {
    let app = app_with(seed());
    let (status, json) = send(&app, "GET", "/api/v1/feed", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], 401);
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_task_appears_in_assignee_feed() {
    let app = app_with(seed());
    create_task(&app, TaskType::RequestTag, &table_link(), SuggestedValue::TagLabels(vec![])).await;

    let (status, json) = get(
        &app,
        "/api/v1/feed?type=Task&filterType=OWNER&taskStatus=Open&userId=user1",
        "user1",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["task"]["status"], "Open");
    assert_eq!(counts(&app).await, (1, 0));
}

#[tokio::test]
async fn task_on_missing_column_is_400() {
    let app = app_with(seed());
    let about = EntityLink::table_column(FQN, "nope", "tags").to_string();
    let task = NewTask::new(TaskType::RequestTag, &about, vec![ActorRef::user("user1")]).unwrap();
    let body = serde_json::to_value(CreateThread::Task(task)).unwrap();
    let (status, _) = send(&app, "POST", "/api/v1/feed", Some("admin"), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn close_without_comment_is_400_and_task_stays_open() {
    let app = app_with(seed());
    let id = create_task(&app, TaskType::RequestTag, &table_link(), SuggestedValue::TagLabels(vec![])).await;

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/feed/tasks/{id}/close"),
        Some("admin"),
        Some(json!({ "comment": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Task cannot be closed without a comment");
    assert_eq!(counts(&app).await, (1, 0));
}

#[tokio::test]
async fn close_with_comment_then_again_is_409() {
    let app = app_with(seed());
    let id = create_task(&app, TaskType::RequestTag, &table_link(), SuggestedValue::TagLabels(vec![])).await;
    let uri = format!("/api/v1/feed/tasks/{id}/close");

    let (status, json) = send(&app, "PUT", &uri, Some("admin"), Some(json!({ "comment": "not needed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["task"]["status"], "Closed");
    assert_eq!(json["task"]["suggestion"]["status"], "Rejected");
    assert_eq!(json["posts"][0]["message"], "not needed");

    let (status, _) = send(&app, "PUT", &uri, Some("admin"), Some(json!({ "comment": "again" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(counts(&app).await, (0, 1));
}

#[tokio::test]
async fn resolve_description_updates_entity() {
    let app = app_with(seed());
    let id = create_task(
        &app,
        TaskType::RequestDescription,
        &table_link(),
        SuggestedValue::Description("All customer orders".into()),
    )
    .await;

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/feed/tasks/{id}/resolve"),
        Some("user1"),
        Some(json!({})),
    )
    .await;
    // user1 holds the default role, which denies descriptions
    assert_eq!(status, StatusCode::FORBIDDEN, "{json}");

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/feed/tasks/{id}/resolve"),
        Some("admin"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["thread"]["task"]["status"], "Closed");
    assert_eq!(json["thread"]["task"]["newValue"], "All customer orders");
    assert_eq!(json["entity"]["description"], "All customer orders");

    let (_, table) = get(&app, &format!("/api/v1/tables/name/{FQN}"), "admin").await;
    assert_eq!(table["description"], "All customer orders");
    assert_eq!(table["version"], 0.2);
}

#[tokio::test]
async fn resolve_nested_column_tags_targets_that_column() {
    let app = app_with(seed());
    let about = EntityLink::table_column(FQN, "details.street", "tags").to_string();
    let id = create_task(
        &app,
        TaskType::RequestTag,
        &about,
        SuggestedValue::TagLabels(vec![TagLabel::classification("PII.Sensitive")]),
    )
    .await;

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/feed/tasks/{id}/resolve"),
        Some("user1"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let details = &json["entity"]["columns"][1];
    assert_eq!(details["children"][0]["tags"][0]["tagFQN"], "PII.Sensitive");
    assert!(json["entity"]["tags"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn resolve_with_edited_value_uses_override() {
    let app = app_with(seed());
    let id = create_task(
        &app,
        TaskType::UpdateDescription,
        &table_link(),
        SuggestedValue::Description("draft".into()),
    )
    .await;
    let body = json!({ "newValue": { "description": "final" } });
    let (status, json) = send(&app, "PUT", &format!("/api/v1/feed/tasks/{id}/resolve"), Some("admin"), Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["entity"]["description"], "final");
}

#[tokio::test]
async fn denial_leaves_task_and_entity_untouched() {
    let app = app_with(seed());
    let id = create_task(
        &app,
        TaskType::RequestDescription,
        &table_link(),
        SuggestedValue::Description("from bob".into()),
    )
    .await;

    let (status, json) = send(
        &app,
        "PUT",
        &format!("/api/v1/feed/tasks/{id}/resolve"),
        Some("bob"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let denial = Denial::parse(json["message"].as_str().unwrap()).unwrap();
    assert_eq!(denial.principal, "bob");
    assert_eq!(denial.operation, Operation::EditDescription);
    assert_eq!(denial.rule, "noDescriptions");

    let (_, task) = get(&app, &format!("/api/v1/feed/tasks/{id}"), "bob").await;
    assert_eq!(task["task"]["status"], "Open");
    assert_eq!(task["task"]["suggestion"]["status"], "Pending");
    let (_, table) = get(&app, &format!("/api/v1/tables/name/{FQN}"), "bob").await;
    assert!(table.get("description").is_none());
    assert_eq!(table["version"], 0.1);
}

#[tokio::test]
async fn unknown_task_is_404() {
    let app = app_with(seed());
    let (status, json) = get(&app, "/api/v1/feed/tasks/99", "admin").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], 404);
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn replies_and_author_only_delete() {
    let app = app_with(seed());
    let body = json!({ "threadType": "Conversation", "about": table_link(), "message": "who owns this?" });
    let (status, thread) = send(&app, "POST", "/api/v1/feed", Some("user1"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = thread["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "POST", &format!("/api/v1/feed/{id}/posts"), Some("bob"), Some(json!({ "message": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, thread) = send(&app, "POST", &format!("/api/v1/feed/{id}/posts"), Some("bob"), Some(json!({ "message": "me" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["postsCount"], 1);
    let post_id = thread["posts"][0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/v1/feed/{id}/posts/{post_id}");
    let (status, _) = send(&app, "DELETE", &uri, Some("user1"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, thread) = send(&app, "DELETE", &uri, Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(thread["postsCount"], 0);
}

#[tokio::test]
async fn reaction_patch_is_applied() {
    let app = app_with(seed());
    let body = json!({ "threadType": "Conversation", "about": table_link(), "message": "hello" });
    let (_, thread) = send(&app, "POST", "/api/v1/feed", Some("user1"), Some(body)).await;
    let id = thread["id"].as_str().unwrap().to_string();

    let ops = json!([{
        "op": "add",
        "path": "/reactions/-",
        "value": { "reactionType": "heart", "user": { "type": "user", "name": "bob" } }
    }]);
    let (status, json) = send(&app, "PATCH", &format!("/api/v1/feed/{id}"), Some("bob"), Some(ops.clone())).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["reactions"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "PATCH", &format!("/api/v1/feed/{id}"), Some("user1"), Some(ops)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Incidents
// ---------------------------------------------------------------------------

fn seed_with_incidents(n: i64) -> (Seed, Vec<ResolutionStatus>) {
    let mut seed = seed();
    let now = now_millis();
    for i in 0..n {
        seed.incidents.push(ResolutionStatus::new_incident(
            EntityRef::test_case(format!("{FQN}.id.tc{i}")),
            now - 60_000 * (i + 1),
        ));
    }
    let incidents = seed.incidents.clone();
    (seed, incidents)
}

const INCIDENTS: &str = "/api/v1/dataQuality/testCases/testCaseIncidentStatus";

#[tokio::test]
async fn incident_pages_follow_cursors() {
    let (seed, _) = seed_with_incidents(20);
    let app = app_with(seed);

    let (status, first) = get(&app, &format!("{INCIDENTS}?latest=true&limit=15"), "admin").await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert_eq!(first["data"].as_array().unwrap().len(), 15);
    assert_eq!(first["paging"]["total"], 20);
    assert!(first["paging"].get("before").is_none());
    let after = first["paging"]["after"].as_str().unwrap().to_string();

    let (_, second) = get(&app, &format!("{INCIDENTS}?latest=true&limit=15&after={after}"), "admin").await;
    assert_eq!(second["data"].as_array().unwrap().len(), 5);
    assert!(second["paging"].get("after").is_none());
    let before = second["paging"]["before"].as_str().unwrap().to_string();

    let (_, back) = get(&app, &format!("{INCIDENTS}?latest=true&limit=15&before={before}"), "admin").await;
    assert_eq!(back["data"], first["data"]);
}

#[tokio::test]
async fn incident_filter_narrows_rows() {
    let (seed, incidents) = seed_with_incidents(3);
    let app = app_with(seed);
    let fqn = incidents[1].test_case_reference.fqn().to_string();
    let (status, json) = get(&app, &format!("{INCIDENTS}?latest=true&testCaseFQN={fqn}"), "admin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["testCaseReference"]["fullyQualifiedName"], fqn);
}

#[tokio::test]
async fn inverted_range_is_400() {
    let app = app_with(seed());
    let (status, json) = get(&app, &format!("{INCIDENTS}?startTs=10&endTs=5"), "admin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], 400);
}

#[tokio::test]
async fn incident_patch_requires_edit_tests() {
    let (seed, incidents) = seed_with_incidents(1);
    let app = app_with(seed);
    let id = incidents[0].id;
    let ops = json!([{ "op": "add", "path": "/severity", "value": "Severity1" }]);
    let uri = format!("{INCIDENTS}/{id}");

    let (status, json) = send(&app, "PATCH", &uri, Some("bob"), Some(ops.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(json["message"].as_str().unwrap().contains("EditTests"));

    let (status, json) = send(&app, "PATCH", &uri, Some("admin"), Some(ops)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["severity"], "Severity1");
    assert_eq!(json["updatedBy"], "admin");
}

#[tokio::test]
async fn incident_identity_cannot_be_patched() {
    let (seed, incidents) = seed_with_incidents(1);
    let app = app_with(seed);
    let ops = json!([{ "op": "replace", "path": "/stateId", "value": uuid::Uuid::new_v4() }]);
    let (status, _) = send(&app, "PATCH", &format!("{INCIDENTS}/{}", incidents[0].id), Some("admin"), Some(ops)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Search and seed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_users_for_assignee_picker() {
    let app = app_with(seed());
    let (status, json) = get(&app, "/api/v1/search/query?q=bo&index=user_search_index", "admin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"].as_array().unwrap().len(), 1);
    assert_eq!(json["hits"][0]["name"], "bob");

    let (status, _) = get(&app, "/api/v1/search/query?q=x&index=glossary", "admin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[test]
fn bundled_seed_parses() {
    let seed: Seed = serde_yaml::from_str(include_str!("../seed.yaml")).unwrap();
    assert_eq!(seed.entities.len(), 1);
    assert_eq!(seed.incidents.len(), 2);
    assert!(seed.policy.admins.contains(&"admin".to_string()));
}

#[tokio::test]
async fn seed_file_loads_from_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("seed.yaml");
    std::fs::write(&path, SEED).unwrap();
    let state = feed_server::load_state(Some(&path)).unwrap();
    let store = state.store.read().await;
    assert!(store.entity(FQN).is_ok());
}
