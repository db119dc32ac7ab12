use crate::http::FeedApi;
use crate::session::Session;
use feed_core::entity_link::EntityLink;
use feed_core::feed::{reply_count_label, Post, Thread};
use feed_core::guard;
use feed_core::patch;
use feed_core::reaction::{self, ReactionType};
use feed_core::wire::CreateThread;
use feed_core::{FeedError, Result};
use uuid::Uuid;

/// Replies shown under a thread and the "show more" label for the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineReplies<'a> {
    pub shown: &'a [Post],
    pub hidden: usize,
    pub label: String,
}

/// Replies and reactions on any feed thread.
#[derive(Debug, Clone)]
pub struct Conversations {
    api: FeedApi,
    session: Session,
}

impl Conversations {
    pub fn new(api: FeedApi, session: Session) -> Self {
        Self { api, session }
    }

    pub async fn start(&self, about: &EntityLink, message: &str) -> Result<Thread> {
        if !guard::can_submit_comment(message) {
            return Err(FeedError::Validation("message is empty".to_string()));
        }
        let body = CreateThread::Conversation {
            about: about.clone(),
            message: message.to_string(),
        };
        self.api.create_thread(&body).await
    }

    pub async fn reply(&self, thread_id: Uuid, body: &str) -> Result<Thread> {
        if !guard::can_submit_comment(body) {
            return Err(FeedError::Validation("reply is empty".to_string()));
        }
        self.api.add_post(thread_id, body).await
    }

    pub async fn delete_reply(&self, thread_id: Uuid, post_id: Uuid) -> Result<Thread> {
        self.api.delete_post(thread_id, post_id).await
    }

    pub fn inline<'a>(&self, thread: &'a Thread) -> InlineReplies<'a> {
        let limit = self.session.inline_replies;
        InlineReplies {
            shown: thread.inline_replies(limit),
            hidden: thread.hidden_reply_count(limit),
            label: reply_count_label(thread.posts.len()),
        }
    }

    /// Add or remove the session user's reaction of one kind.
    pub async fn toggle_reaction(&self, thread: &Thread, kind: ReactionType) -> Result<Thread> {
        let mut updated = thread.clone();
        reaction::toggle(&mut updated.reactions, kind, &self.session.user);
        self.persist_reactions(thread, &updated).await
    }

    /// Toggle every configured reaction at once.
    pub async fn toggle_all_reactions(&self, thread: &Thread) -> Result<Thread> {
        let mut updated = thread.clone();
        reaction::toggle_all(&mut updated.reactions, &self.session.reactions, &self.session.user);
        self.persist_reactions(thread, &updated).await
    }

    async fn persist_reactions(&self, before: &Thread, after: &Thread) -> Result<Thread> {
        let ops = patch::diff(&serde_json::to_value(before)?, &serde_json::to_value(after)?);
        if ops.is_empty() {
            return Ok(before.clone());
        }
        self.api.patch_thread(before.id, &ops).await
    }
}
