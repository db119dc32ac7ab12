use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    Team,
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorType::User => f.write_str("user"),
            ActorType::Team => f.write_str("team"),
        }
    }
}

/// A user or team, used for assignees, authors and followers alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorRef {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl ActorRef {
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_type: ActorType::User,
            name: name.into(),
            display_name: None,
        }
    }

    pub fn team(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor_type: ActorType::Team,
            name: name.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Display name when set, otherwise the login name.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_same(&self, other: &ActorRef) -> bool {
        self.id == other.id || (self.actor_type == other.actor_type && self.name == other.name)
    }
}

/// Reference to a non-actor entity such as a test case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl EntityRef {
    pub fn test_case(fqn: impl Into<String>) -> Self {
        let fqn = fqn.into();
        let name = fqn.rsplit('.').next().unwrap_or(&fqn).to_string();
        Self {
            id: Uuid::new_v4(),
            entity_type: "testCase".to_string(),
            name,
            fully_qualified_name: Some(fqn),
            display_name: None,
        }
    }

    /// Fully qualified name when present, otherwise the bare name.
    pub fn fqn(&self) -> &str {
        self.fully_qualified_name.as_deref().unwrap_or(&self.name)
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
