use crate::entity_link::EntityLink;
use crate::error::{FeedError, Result};
use crate::feed::Thread;
use crate::reference::ActorRef;
use crate::suggestion::{SuggestedValue, Suggestion};
use crate::types::{TaskStatus, TaskType, ThreadType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CLOSE_WITHOUT_COMMENT: &str = "Task cannot be closed without a comment";

// ---------------------------------------------------------------------------
// TaskDetails
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub id: u64,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub assignees: Vec<ActorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

/// Lifecycle position of a task thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Open { has_comment: bool },
    Closed,
}

impl TaskState {
    pub fn of(thread: &Thread) -> Option<TaskState> {
        let task = thread.task.as_ref()?;
        Some(match task.status {
            TaskStatus::Open => TaskState::Open {
                has_comment: !thread.posts.is_empty(),
            },
            TaskStatus::Closed => TaskState::Closed,
        })
    }

    pub fn is_open(self) -> bool {
        matches!(self, TaskState::Open { .. })
    }
}

// ---------------------------------------------------------------------------
// NewTask
// ---------------------------------------------------------------------------

/// A validated task creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub about: EntityLink,
    pub assignees: Vec<ActorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<SuggestedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NewTask {
    /// Validate the link and assignees. Duplicate assignees are dropped,
    /// keeping first-seen order.
    pub fn new(task_type: TaskType, about: &str, assignees: Vec<ActorRef>) -> Result<Self> {
        let about = EntityLink::parse(about)
            .map_err(|_| FeedError::Validation(format!("malformed entity link '{about}'")))?;
        let mut task = Self {
            task_type,
            about,
            assignees: Vec::new(),
            suggestion: None,
            old_value: None,
            message: None,
        };
        for a in assignees {
            if !task.assignees.iter().any(|x| x.is_same(&a)) {
                task.assignees.push(a);
            }
        }
        task.validate()?;
        Ok(task)
    }

    pub fn with_suggestion(mut self, value: SuggestedValue) -> Result<Self> {
        self.suggestion = Some(value);
        self.validate()?;
        Ok(self)
    }

    pub fn with_old_value(mut self, old: impl Into<String>) -> Self {
        self.old_value = Some(old.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Re-check invariants; used after deserializing a request body.
    pub fn validate(&self) -> Result<()> {
        if self.assignees.is_empty() {
            return Err(FeedError::Validation(
                "a task needs at least one assignee".to_string(),
            ));
        }
        if let Some(value) = &self.suggestion {
            if self.task_type.suggestion_type() != Some(value.suggestion_type()) {
                return Err(FeedError::Validation(format!(
                    "a {} task cannot carry a {} suggestion",
                    self.task_type,
                    value.suggestion_type()
                )));
            }
        }
        Ok(())
    }

    /// Default feed message, e.g. "Request tags for table orders columns/id".
    pub fn title(&self) -> String {
        let target = match &self.about.column {
            Some(col) => format!("{} columns/{col}", self.about.entity_fqn),
            None => self.about.entity_fqn.clone(),
        };
        format!("{} {} {}", self.task_type.title_prefix(), self.about.entity_type, target)
    }

    /// Materialize the task thread as the backend stores it.
    pub fn into_thread(self, task_id: u64, created_by: &str, now: i64) -> Thread {
        let message = self.message.clone().unwrap_or_else(|| self.title());
        let suggestion = self
            .suggestion
            .map(|value| Suggestion::new(self.about.clone(), value, created_by, now));
        Thread {
            id: Uuid::new_v4(),
            thread_type: ThreadType::Task,
            about: self.about,
            message,
            created_by: created_by.to_string(),
            thread_ts: now,
            updated_at: now,
            posts: Vec::new(),
            posts_count: 0,
            reactions: Vec::new(),
            task: Some(TaskDetails {
                id: task_id,
                task_type: self.task_type,
                status: TaskStatus::Open,
                assignees: self.assignees,
                suggestion,
                old_value: self.old_value,
                new_value: None,
                closed_by: None,
                closed_at: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

fn open_task_mut(thread: &mut Thread, target: TaskStatus) -> Result<&mut TaskDetails> {
    let thread_id = thread.id;
    let task = thread
        .task
        .as_mut()
        .ok_or_else(|| FeedError::Validation(format!("thread {thread_id} is not a task")))?;
    if task.status == TaskStatus::Closed {
        return Err(FeedError::InvalidTransition {
            from: TaskStatus::Closed.to_string(),
            to: target.to_string(),
            reason: format!("task {} is already closed", task.id),
        });
    }
    Ok(task)
}

/// Close a task with a mandatory comment. The comment is appended as a reply
/// and any pending suggestion is rejected.
pub fn close(thread: &mut Thread, by: &str, comment: &str, now: i64) -> Result<()> {
    if comment.trim().is_empty() {
        return Err(FeedError::Policy(CLOSE_WITHOUT_COMMENT.to_string()));
    }
    let task = open_task_mut(thread, TaskStatus::Closed)?;
    task.status = TaskStatus::Closed;
    task.closed_by = Some(by.to_string());
    task.closed_at = Some(now);
    if let Some(s) = task.suggestion.as_mut() {
        if s.is_pending() {
            s.reject(now)?;
        }
    }
    thread.add_post(by, comment, now);
    Ok(())
}

/// Resolve a task by accepting its suggestion, optionally overridden by
/// `new_value`. Returns the accepted suggestion to merge into the entity.
pub fn resolve(
    thread: &mut Thread,
    by: &str,
    new_value: Option<SuggestedValue>,
    now: i64,
) -> Result<Suggestion> {
    let about = thread.about.clone();
    let task = open_task_mut(thread, TaskStatus::Closed)?;

    let mut suggestion = match (task.suggestion.clone(), new_value) {
        (Some(mut s), Some(value)) => {
            s.suggestion_type = value.suggestion_type();
            s.value = value;
            s
        }
        (Some(s), None) => s,
        (None, Some(value)) => Suggestion::new(about, value, by, now),
        (None, None) => {
            return Err(FeedError::Validation(format!(
                "task {} has no suggestion to accept",
                task.id
            )))
        }
    };
    if task.task_type.suggestion_type() != Some(suggestion.suggestion_type) {
        return Err(FeedError::Validation(format!(
            "a {} task cannot accept a {} suggestion",
            task.task_type, suggestion.suggestion_type
        )));
    }
    suggestion.accept(now)?;

    task.new_value = Some(suggestion.value.as_text());
    task.status = TaskStatus::Closed;
    task.closed_by = Some(by.to_string());
    task.closed_at = Some(now);
    task.suggestion = Some(suggestion.clone());
    thread.updated_at = now;
    Ok(suggestion)
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCount {
    pub open: usize,
    pub closed: usize,
}

impl TaskCount {
    pub fn of<'a>(threads: impl IntoIterator<Item = &'a Thread>) -> Self {
        let mut count = TaskCount::default();
        for t in threads {
            match t.task.as_ref().map(|task| task.status) {
                Some(TaskStatus::Open) => count.open += 1,
                Some(TaskStatus::Closed) => count.closed += 1,
                None => {}
            }
        }
        count
    }

    /// "2 Open", "1 Closed" badge text.
    pub fn labels(&self) -> (String, String) {
        (format!("{} Open", self.open), format!("{} Closed", self.closed))
    }
}

/// Find a task thread by numeric task id.
pub fn find_by_task_id(threads: &[Thread], task_id: u64) -> Option<&Thread> {
    threads
        .iter()
        .find(|t| t.task.as_ref().is_some_and(|task| task.id == task_id))
}

pub fn find_by_task_id_mut(threads: &mut [Thread], task_id: u64) -> Result<&mut Thread> {
    threads
        .iter_mut()
        .find(|t| t.task.as_ref().is_some_and(|task| task.id == task_id))
        .ok_or(FeedError::TaskNotFound(task_id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
