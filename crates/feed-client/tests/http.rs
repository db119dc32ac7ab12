mod common;

use common::{api, session, FQN};
use feed_client::{IncidentManager, TaskEngine};
use feed_core::entity::{CatalogEntity, Column};
use feed_core::entity_link::EntityLink;
use feed_core::filter::{encode_cursor, IncidentFilter};
use feed_core::incident::{IncidentPage, Paging, ResolutionStatus};
use feed_core::reference::EntityRef;
use feed_core::reference::ActorRef;
use feed_core::suggestion::SuggestedValue;
use feed_core::task::{NewTask, TaskCount};
use feed_core::types::{TaskStatus, TaskType};
use feed_core::wire::{ResolvedTask, ThreadList};
use feed_core::FeedError;
use mockito::{Matcher, Server, ServerGuard};

fn table() -> CatalogEntity {
    CatalogEntity::table(FQN, vec![Column::new("id")])
}

fn open_task() -> ThreadList {
    let thread = NewTask::new(
        TaskType::UpdateDescription,
        &EntityLink::table(FQN).to_string(),
        vec![ActorRef::user("admin")],
    )
    .unwrap()
    .with_suggestion(SuggestedValue::Description("Orders".into()))
    .unwrap()
    .into_thread(7, "admin", 1_700_000_000_000);
    ThreadList {
        data: vec![thread],
        ..ThreadList::default()
    }
}

/// Mock the three reads behind `TaskEngine::open`.
async fn mock_entity_view(server: &mut ServerGuard) {
    server
        .mock("GET", format!("/api/v1/tables/name/{FQN}").as_str())
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&table()).unwrap())
        .create_async()
        .await;
    server
        .mock("GET", "/api/v1/feed")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&open_task()).unwrap())
        .create_async()
        .await;
    server
        .mock("GET", "/api/v1/feed/count")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&TaskCount { open: 1, closed: 0 }).unwrap())
        .create_async()
        .await;
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = api(&format!("http://127.0.0.1:{port}"), "admin")
        .get_table(FQN)
        .await
        .unwrap_err();
    assert!(matches!(err, FeedError::Network(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn backend_exception_is_internal_and_cache_is_untouched() {
    let mut server = Server::new_async().await;
    mock_entity_view(&mut server).await;
    let resolve = server
        .mock("PUT", "/api/v1/feed/tasks/7/resolve")
        .with_status(500)
        .with_body("java.lang.NullPointerException: owners is null")
        .expect(1)
        .create_async()
        .await;

    let mut engine = TaskEngine::new(api(&server.url(), "admin"), session("admin"));
    engine.open(FQN).await.unwrap();
    let err = engine.accept_suggestion(7).await.unwrap_err();

    resolve.assert_async().await;
    assert!(matches!(err, FeedError::Internal(ref m) if m.contains("owners is null")));
    let cache = engine.cache().unwrap();
    assert!(cache.entity().description.is_none());
    assert_eq!(cache.counts(), TaskCount { open: 1, closed: 0 });
    assert!(cache.task(7).unwrap().task.as_ref().unwrap().suggestion.is_some());
}

#[tokio::test]
async fn close_without_comment_sends_nothing() {
    let mut server = Server::new_async().await;
    mock_entity_view(&mut server).await;
    let close = server
        .mock("PUT", "/api/v1/feed/tasks/7/close")
        .expect(0)
        .create_async()
        .await;

    let mut engine = TaskEngine::new(api(&server.url(), "admin"), session("admin"));
    engine.open(FQN).await.unwrap();
    let err = engine.close_task(7, "").await.unwrap_err();

    assert!(matches!(err, FeedError::Policy(_)));
    close.assert_async().await;
}

#[tokio::test]
async fn denial_body_maps_to_permission() {
    let mut server = Server::new_async().await;
    mock_entity_view(&mut server).await;
    server
        .mock("PUT", "/api/v1/feed/tasks/7/close")
        .with_status(403)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"code":403,"message":"Principal: CatalogPrincipal{name='admin'} operation EditDescription denied by role DataConsumer, policy DataConsumerPolicy, rule noDescriptions"}"#,
        )
        .create_async()
        .await;

    let mut engine = TaskEngine::new(api(&server.url(), "admin"), session("admin"));
    engine.open(FQN).await.unwrap();
    let err = engine.close_task(7, "not needed").await.unwrap_err();
    assert!(matches!(err, FeedError::Permission(ref d) if d.rule == "noDescriptions"));
    assert_eq!(engine.cache().unwrap().counts(), TaskCount { open: 1, closed: 0 });
}

const INCIDENTS: &str = "/api/v1/dataQuality/testCases/testCaseIncidentStatus";

#[tokio::test]
async fn failed_next_page_keeps_page_number() {
    let mut server = Server::new_async().await;
    let first = IncidentPage {
        data: vec![ResolutionStatus::new_incident(EntityRef::test_case("t.a"), 10)],
        paging: Paging {
            before: None,
            after: Some(encode_cursor(15)),
            total: 20,
        },
    };
    server
        .mock("GET", INCIDENTS)
        .match_query(Matcher::Regex(r"endTs=\d+$".into()))
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&first).unwrap())
        .create_async()
        .await;
    let next = server
        .mock("GET", INCIDENTS)
        .match_query(Matcher::Regex("after=".into()))
        .with_status(500)
        .with_body("search backend unavailable")
        .expect(2)
        .create_async()
        .await;

    let filter = IncidentFilter::between(0, 100).unwrap();
    let mut m = IncidentManager::new(api(&server.url(), "admin"), filter, 15);
    assert!(m.load().await.unwrap());

    for _ in 0..2 {
        let err = m.next_page().await.unwrap_err();
        assert!(matches!(err, FeedError::Internal(_)));
        assert_eq!(m.board().current_page(), 1);
        assert_eq!(m.board().paging().after.as_deref(), Some(encode_cursor(15).as_str()));
        assert_eq!(m.board().rows(), first.data.as_slice());
    }
    next.assert_async().await;
}

#[tokio::test]
async fn unmergeable_resolve_still_refreshes_tasks() {
    let mut server = Server::new_async().await;
    mock_entity_view(&mut server).await;

    let mut thread = open_task().data.remove(0);
    if let Some(task) = thread.task.as_mut() {
        task.status = TaskStatus::Closed;
    }
    let mut entity = table();
    entity.description = Some("Orders".into());
    entity.bump_version();
    let resolved = ResolvedTask {
        thread: thread.clone(),
        entity,
    };
    server
        .mock("PUT", "/api/v1/feed/tasks/7/resolve")
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&resolved).unwrap())
        .create_async()
        .await;
    let refreshed = server
        .mock("GET", "/api/v1/feed")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::to_string(&ThreadList {
                data: vec![thread],
                ..ThreadList::default()
            })
            .unwrap(),
        )
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", "/api/v1/feed/count")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&TaskCount { open: 0, closed: 1 }).unwrap())
        .create_async()
        .await;

    let mut engine = TaskEngine::new(api(&server.url(), "admin"), session("admin"));
    engine.open(FQN).await.unwrap();
    let entity = engine.accept_suggestion(7).await.unwrap();

    refreshed.assert_async().await;
    assert_eq!(entity.description.as_deref(), Some("Orders"));
    assert_eq!(engine.cache().unwrap().counts(), TaskCount { open: 0, closed: 1 });
}
