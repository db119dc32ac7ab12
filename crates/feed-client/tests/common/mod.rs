#![allow(dead_code)]

use feed_client::{FeedApi, Session};
use feed_core::clock::now_millis;
use feed_core::incident::ResolutionStatus;
use feed_core::reference::EntityRef;
use feed_server::{AppState, Seed};
use std::time::Duration;

pub const FQN: &str = "svc.db.schema.orders";

const SEED: &str = r#"
users:
  - { type: user, name: admin, displayName: Admin }
  - { type: user, name: user1 }
  - { type: user, name: bob, displayName: Bob }
teams:
  - { type: team, name: data-platform, displayName: Data Platform }
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

pub fn seed() -> Seed {
    serde_yaml::from_str(SEED).unwrap()
}

/// Seed plus `n` open incidents, one per test case, one minute apart.
pub fn seed_with_incidents(n: i64) -> Seed {
    let mut seed = seed();
    let now = now_millis();
    for i in 0..n {
        seed.incidents.push(ResolutionStatus::new_incident(
            EntityRef::test_case(format!("{FQN}.id.tc{i:02}")),
            now - 60_000 * (i + 1),
        ));
    }
    seed
}

/// Start a reference server on an ephemeral port and return its base URL.
pub async fn start_server(seed: Seed) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(feed_server::serve_on(AppState::from_seed(seed), listener));
    format!("http://127.0.0.1:{port}")
}

pub fn api(base_url: &str, user: &str) -> FeedApi {
    FeedApi::new(base_url, user, Duration::from_secs(5)).unwrap()
}

pub fn session(user: &str) -> Session {
    Session::new(user)
}
