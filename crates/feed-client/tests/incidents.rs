mod common;

use common::{api, seed_with_incidents, start_server};
use feed_client::IncidentManager;
use feed_core::clock::now_millis;
use feed_core::config::IncidentConfig;
use feed_core::reference::{ActorRef, ActorType};
use feed_core::types::{Operation, ResolutionStatusType, Severity};
use feed_core::FeedError;

fn config() -> IncidentConfig {
    IncidentConfig::default()
}

async fn manager(base: &str, user: &str) -> IncidentManager {
    let mut m = IncidentManager::from_url(api(base, user), "", now_millis(), &config()).unwrap();
    assert!(m.load().await.unwrap());
    m
}

#[tokio::test]
async fn pages_forward_and_back() {
    let base = start_server(seed_with_incidents(20)).await;
    let mut m = manager(&base, "admin").await;
    assert_eq!(m.board().rows().len(), 15);
    assert_eq!(m.board().paging().total, 20);
    let first = m.board().rows().to_vec();

    assert!(m.next_page().await.unwrap());
    assert_eq!(m.board().current_page(), 2);
    assert_eq!(m.board().rows().len(), 5);
    assert!(!m.next_page().await.unwrap());

    assert!(m.previous_page().await.unwrap());
    assert_eq!(m.board().current_page(), 1);
    assert_eq!(m.board().rows(), first.as_slice());
}

#[tokio::test]
async fn filter_change_resets_to_first_page() {
    let base = start_server(seed_with_incidents(20)).await;
    let mut m = manager(&base, "admin").await;
    m.next_page().await.unwrap();

    let fqn = m.board().rows()[0].test_case_reference.fqn().to_string();
    let filter = m.board().filter().clone().with_test_case(Some(fqn.clone()));
    m.set_filter(filter).await.unwrap();
    assert_eq!(m.board().current_page(), 1);
    assert_eq!(m.board().rows().len(), 1);
    assert!(m.url_query().contains("testCaseFQN="));
}

#[tokio::test]
async fn url_query_restores_the_same_filter() {
    let base = start_server(seed_with_incidents(3)).await;
    let mut m = manager(&base, "admin").await;
    let filter = m
        .board()
        .filter()
        .clone()
        .with_assignee(Some("bob".into()))
        .with_status(Some(ResolutionStatusType::Assigned));
    m.set_filter(filter.clone()).await.unwrap();
    assert!(m.board().rows().is_empty());

    let restored = IncidentManager::from_url(api(&base, "admin"), &m.url_query(), 0, &config()).unwrap();
    assert_eq!(restored.board().filter(), &filter);
}

#[tokio::test]
async fn severity_update_replaces_row_with_server_record() {
    let base = start_server(seed_with_incidents(2)).await;
    let mut m = manager(&base, "admin").await;
    let id = m.board().rows()[0].id;

    let record = m.update_severity(id, Some(Severity::Severity2)).await.unwrap();
    assert_eq!(record.updated_by.as_deref(), Some("admin"));
    let row = m.board().rows().iter().find(|r| r.id == id).unwrap();
    assert_eq!(row, &record);
    assert!(m.board().pending().is_none());
}

#[tokio::test]
async fn assignment_moves_incident_to_assigned() {
    let base = start_server(seed_with_incidents(1)).await;
    let mut m = manager(&base, "admin").await;
    let id = m.board().rows()[0].id;

    let record = m.assign(id, ActorRef::user("bob")).await.unwrap();
    assert_eq!(record.test_case_resolution_status_type, ResolutionStatusType::Assigned);
    assert_eq!(record.assignee().unwrap().name, "bob");
    let options = m.board().assignee_options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].value, "bob");
}

#[tokio::test]
async fn denied_update_leaves_row_unchanged() {
    let base = start_server(seed_with_incidents(1)).await;
    let mut m = manager(&base, "bob").await;
    let before = m.board().rows()[0].clone();

    let err = m.update_severity(before.id, Some(Severity::Severity1)).await.unwrap_err();
    assert!(matches!(err, FeedError::Permission(ref d) if d.operation == Operation::EditTests));
    assert_eq!(m.board().rows()[0], before);
    assert!(m.board().pending().is_none());
}

#[tokio::test]
async fn assignee_search_covers_users_and_teams() {
    let base = start_server(seed_with_incidents(1)).await;
    let m = manager(&base, "admin").await;

    let options = m.search_assignees("").await.unwrap();
    assert_eq!(options.len(), 4);
    let team = options.iter().find(|o| o.actor_type == ActorType::Team).unwrap();
    assert_eq!(team.label, "Data Platform");

    let bob = m.search_assignees("bo").await.unwrap();
    assert_eq!(bob.len(), 1);
    assert_eq!(bob[0].label, "Bob");

    let cases = m.search_test_cases("tc00").await.unwrap();
    assert_eq!(cases.len(), 1);
}
