use crate::entity_link::EntityLink;
use crate::error::{FeedError, Result};
use crate::reaction::Reaction;
use crate::task::TaskDetails;
use crate::types::ThreadType;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Replies shown under a thread before "show more".
pub const DEFAULT_INLINE_REPLIES: usize = 3;

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub thread_id: Uuid,
    /// Author login name.
    pub from: String,
    pub message: String,
    pub post_ts: i64,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

// ---------------------------------------------------------------------------
// Thread
// ---------------------------------------------------------------------------

/// A feed entry: a conversation, an announcement, or a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub thread_type: ThreadType,
    pub about: EntityLink,
    pub message: String,
    pub created_by: String,
    pub thread_ts: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub posts_count: usize,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskDetails>,
}

impl Thread {
    pub fn conversation(
        about: EntityLink,
        message: impl Into<String>,
        created_by: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            thread_type: ThreadType::Conversation,
            about,
            message: message.into(),
            created_by: created_by.into(),
            thread_ts: now,
            updated_at: now,
            posts: Vec::new(),
            posts_count: 0,
            reactions: Vec::new(),
            task: None,
        }
    }

    pub fn is_task(&self) -> bool {
        self.task.is_some()
    }

    /// Append a reply and return its id.
    pub fn add_post(&mut self, from: impl Into<String>, message: impl Into<String>, now: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.push(Post {
            id,
            thread_id: self.id,
            from: from.into(),
            message: message.into(),
            post_ts: now,
            reactions: Vec::new(),
        });
        self.posts_count = self.posts.len();
        self.updated_at = now;
        id
    }

    /// Remove a reply. Only its author may delete it.
    pub fn delete_post(&mut self, post_id: Uuid, actor: &str) -> Result<Post> {
        let pos = self
            .posts
            .iter()
            .position(|p| p.id == post_id)
            .ok_or_else(|| FeedError::PostNotFound(post_id.to_string()))?;
        if self.posts[pos].from != actor {
            return Err(FeedError::Policy(
                "Only the author can delete a reply".to_string(),
            ));
        }
        let removed = self.posts.remove(pos);
        self.posts_count = self.posts.len();
        Ok(removed)
    }

    /// The replies rendered inline: the most recent `limit`, oldest first.
    pub fn inline_replies(&self, limit: usize) -> &[Post] {
        let start = self.posts.len().saturating_sub(limit);
        &self.posts[start..]
    }

    pub fn hidden_reply_count(&self, limit: usize) -> usize {
        self.posts.len().saturating_sub(limit)
    }

    pub fn latest_post(&self) -> Option<&Post> {
        self.posts.last()
    }

    /// Whether `@name` appears in the thread message or any reply. A longer
    /// name sharing the prefix (`@user10` for `user1`) is not a mention.
    pub fn mentions(&self, name: &str) -> bool {
        let Ok(re) = mention_re(name) else {
            return false;
        };
        re.is_match(&self.message) || self.posts.iter().any(|p| re.is_match(&p.message))
    }
}

/// `@name` delimited by non-name characters. A trailing `.` ends the name
/// when nothing name-like follows it.
fn mention_re(name: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?:^|[^\w.\-])@{}(?:$|[^\w.\-]|\.(?:$|[^\w\-]))",
        regex::escape(name)
    ))
}

/// "04 Replies", "01 Reply".
pub fn reply_count_label(count: usize) -> String {
    if count == 1 {
        "01 Reply".to_string()
    } else {
        format!("{count:02} Replies")
    }
}

/// Feeds are shown newest first.
pub fn sort_newest_first(threads: &mut [Thread]) {
    threads.sort_by(|a, b| b.thread_ts.cmp(&a.thread_ts));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
