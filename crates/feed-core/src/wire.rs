//! Request and response bodies shared by the HTTP client and the reference
//! server.

use crate::entity::CatalogEntity;
use crate::entity_link::EntityLink;
use crate::error::FeedError;
use crate::feed::Thread;
use crate::incident::Paging;
use crate::suggestion::SuggestedValue;
use crate::task::NewTask;
use crate::types::{FeedFilter, TaskStatus, ThreadType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Header carrying the acting principal's login name.
pub const PRINCIPAL_HEADER: &str = "X-Catalog-User";

pub const API_PREFIX: &str = "/api/v1";

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// Query parameters of `GET /feed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub thread_type: Option<ThreadType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_type: Option<FeedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_link: Option<String>,
}

impl FeedQuery {
    /// Tasks with `status` about `link` (entity or column).
    pub fn tasks_about(link: &EntityLink, status: TaskStatus) -> Self {
        Self {
            thread_type: Some(ThreadType::Task),
            task_status: Some(status),
            entity_link: Some(link.to_string()),
            ..Self::default()
        }
    }

    /// Tasks visible to `user` under `filter`.
    pub fn tasks_for_user(user: &str, filter: FeedFilter, status: TaskStatus) -> Self {
        Self {
            thread_type: Some(ThreadType::Task),
            filter_type: Some(filter),
            task_status: Some(status),
            user_id: Some(user.to_string()),
            entity_link: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadList {
    pub data: Vec<Thread>,
    #[serde(default)]
    pub paging: Paging,
}

/// Body of `POST /feed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "threadType")]
pub enum CreateThread {
    Conversation { about: EntityLink, message: String },
    Task(NewTask),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloseTask {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveTask {
    /// Overrides the suggested value when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<SuggestedValue>,
}

/// Response of `PUT /feed/tasks/{id}/resolve`: the closed task and the
/// entity after the suggestion was merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTask {
    pub thread: Thread,
    pub entity: CatalogEntity,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchIndex {
    User,
    Team,
    TestCase,
    Table,
}

impl SearchIndex {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchIndex::User => "user_search_index",
            SearchIndex::Team => "team_search_index",
            SearchIndex::TestCase => "test_case_search_index",
            SearchIndex::Table => "table_search_index",
        }
    }
}

impl fmt::Display for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchIndex {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_search_index" | "user" => Ok(SearchIndex::User),
            "team_search_index" | "team" => Ok(SearchIndex::Team),
            "test_case_search_index" | "testCase" => Ok(SearchIndex::TestCase),
            "table_search_index" | "table" => Ok(SearchIndex::Table),
            _ => Err(FeedError::InvalidQuery(format!("unknown search index '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub fully_qualified_name: String,
    pub entity_type: String,
}

impl SearchHit {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
}
