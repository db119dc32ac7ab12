use crate::http::FeedApi;
use crate::session::Session;
use feed_core::cache::EntityCache;
use feed_core::entity::CatalogEntity;
use feed_core::entity_link::EntityLink;
use feed_core::feed::Thread;
use feed_core::guard;
use feed_core::permission::{require, AllowAll, PermissionGate};
use feed_core::suggestion::{SuggestedValue, SuggestionBoard};
use feed_core::task::{NewTask, TaskCount, CLOSE_WITHOUT_COMMENT};
use feed_core::types::{Operation, SuggestionType, ThreadType};
use feed_core::wire::{CreateThread, FeedQuery};
use feed_core::{FeedError, Result};
use std::sync::Arc;
use uuid::Uuid;

/// Drives tasks through their lifecycle against the API and keeps the
/// viewed entity's cache in step with the server.
///
/// Writes take `&mut self`, so two mutations never overlap. Local state only
/// changes after the server confirms a write.
pub struct TaskEngine {
    api: FeedApi,
    session: Session,
    gate: Arc<dyn PermissionGate + Send + Sync>,
    cache: Option<EntityCache>,
    suggestions: SuggestionBoard,
}

fn already_closed(thread: &Thread) -> FeedError {
    FeedError::InvalidTransition {
        from: "Closed".to_string(),
        to: "Closed".to_string(),
        reason: format!(
            "task {} is already closed",
            thread.task.as_ref().map(|t| t.id).unwrap_or_default()
        ),
    }
}

impl TaskEngine {
    /// The server remains the authority on permissions; the local gate
    /// allows everything until [`with_gate`](Self::with_gate) is called.
    pub fn new(api: FeedApi, session: Session) -> Self {
        Self {
            api,
            session,
            gate: Arc::new(AllowAll),
            cache: None,
            suggestions: SuggestionBoard::default(),
        }
    }

    /// Check permissions locally before sending a write.
    pub fn with_gate(mut self, gate: impl PermissionGate + Send + Sync + 'static) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cache(&self) -> Option<&EntityCache> {
        self.cache.as_ref()
    }

    /// Suggestions carried by the cached tasks.
    pub fn suggestions(&self) -> &SuggestionBoard {
        &self.suggestions
    }

    /// Limit bulk accept and reject to one author's suggestions.
    pub fn set_active_author(&mut self, author: Option<String>) {
        self.suggestions.set_active_user(author);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Load an entity and its task list, replacing whatever was cached.
    pub async fn open(&mut self, fqn: &str) -> Result<&EntityCache> {
        let entity = self.api.get_table(fqn).await?;
        let (tasks, counts) = self.fetch_tasks(&entity.link()).await?;
        let mut cache = EntityCache::new(entity);
        cache.set_tasks(tasks, counts);
        self.suggestions.replace_all(cache.suggestions());
        Ok(self.cache.insert(cache))
    }

    /// Task list and open/closed counts, fetched concurrently.
    async fn fetch_tasks(&self, link: &EntityLink) -> Result<(Vec<Thread>, TaskCount)> {
        let query = FeedQuery {
            thread_type: Some(ThreadType::Task),
            entity_link: Some(link.to_string()),
            ..FeedQuery::default()
        };
        let (list, counts) = tokio::join!(self.api.list_threads(&query), self.api.count(Some(link)));
        Ok((list?.data, counts?))
    }

    pub async fn refresh(&mut self) -> Result<()> {
        let Some(link) = self.cache.as_ref().map(|c| c.entity().link()) else {
            return Ok(());
        };
        let (tasks, counts) = self.fetch_tasks(&link).await?;
        if let Some(cache) = self.cache.as_mut() {
            cache.set_tasks(tasks, counts);
            self.suggestions.replace_all(cache.suggestions());
        }
        Ok(())
    }

    async fn thread_for(&self, task_id: u64) -> Result<Thread> {
        match self.cache.as_ref().and_then(|c| c.task(task_id)) {
            Some(thread) => Ok(thread.clone()),
            None => self.api.get_task(task_id).await,
        }
    }

    fn cache_for(&mut self, about: &EntityLink) -> Option<&mut EntityCache> {
        self.cache
            .as_mut()
            .filter(|c| c.entity().fully_qualified_name == about.entity_fqn)
    }

    fn check_edit(&self, thread: &Thread) -> Result<()> {
        let operation = thread
            .task
            .as_ref()
            .map(|t| t.task_type.edit_operation())
            .unwrap_or(Operation::EditAll);
        require(&*self.gate, &self.session.user, operation, &thread.about)
    }

    /// Fold a confirmed thread into the cache and re-read the task list.
    /// A failed re-read is logged; the write itself already succeeded.
    async fn after_write(&mut self, thread: &Thread) {
        let Some(cache) = self.cache_for(&thread.about) else {
            return;
        };
        cache.upsert_thread(thread.clone());
        if let Some(s) = thread.task.as_ref().and_then(|t| t.suggestion.clone()) {
            self.suggestions.upsert(s);
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after write failed");
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub async fn create_task(&mut self, task: NewTask) -> Result<Thread> {
        task.validate()?;
        let thread = self.api.create_thread(&CreateThread::Task(task)).await?;
        tracing::info!(
            task_id = thread.task.as_ref().map(|t| t.id).unwrap_or_default(),
            about = %thread.about,
            "task created"
        );
        self.after_write(&thread).await;
        Ok(thread)
    }

    pub async fn add_comment(&mut self, task_id: u64, body: &str) -> Result<Thread> {
        if !guard::can_submit_comment(body) {
            return Err(FeedError::Validation("comment is empty".to_string()));
        }
        let thread = self.thread_for(task_id).await?;
        let thread = self.api.add_post(thread.id, body).await?;
        self.after_write(&thread).await;
        Ok(thread)
    }

    /// Close a task with a comment. A pending suggestion is rejected.
    pub async fn close_task(&mut self, task_id: u64, comment: &str) -> Result<Thread> {
        if !guard::can_submit_comment(comment) {
            return Err(FeedError::Policy(CLOSE_WITHOUT_COMMENT.to_string()));
        }
        let thread = self.thread_for(task_id).await?;
        if !guard::can_close(&thread, comment) {
            return Err(already_closed(&thread));
        }
        self.check_edit(&thread)?;
        let thread = self.api.close_task(task_id, comment).await?;
        tracing::info!(task_id, "task closed");
        self.after_write(&thread).await;
        Ok(thread)
    }

    /// Reject the task's suggestion. Rejection closes the task, so it needs a
    /// comment like any close.
    pub async fn reject_suggestion(&mut self, task_id: u64, comment: &str) -> Result<Thread> {
        if !guard::can_submit_comment(comment) {
            return Err(FeedError::Policy(CLOSE_WITHOUT_COMMENT.to_string()));
        }
        let thread = self.thread_for(task_id).await?;
        if !guard::can_reject(&thread) {
            return Err(already_closed(&thread));
        }
        self.close_task(task_id, comment).await
    }

    /// Accept the pending suggestion and return the updated entity.
    pub async fn accept_suggestion(&mut self, task_id: u64) -> Result<CatalogEntity> {
        self.accept_with(task_id, None).await
    }

    /// Accept with an edited value in place of the suggested one.
    pub async fn accept_with(
        &mut self,
        task_id: u64,
        new_value: Option<SuggestedValue>,
    ) -> Result<CatalogEntity> {
        let thread = self.thread_for(task_id).await?;
        if !guard::can_reject(&thread) {
            return Err(already_closed(&thread));
        }
        if new_value.is_none() && !guard::can_accept(&thread) {
            return Err(FeedError::Validation(format!(
                "task {task_id} has no pending suggestion"
            )));
        }
        self.check_edit(&thread)?;

        let resolved = self.api.resolve_task(task_id, new_value).await?;
        tracing::info!(task_id, version = resolved.entity.version, "suggestion accepted");

        let accepted = resolved
            .thread
            .task
            .as_ref()
            .and_then(|t| t.suggestion.clone());
        let entity = match self.cache_for(&resolved.thread.about) {
            Some(cache) => {
                cache.replace_entity(resolved.entity.clone());
                if let Some(s) = &accepted {
                    if let Err(e) = cache.merge_accepted(s) {
                        tracing::warn!(task_id, error = %e, "accepted suggestion not merged into cache");
                    }
                }
                cache.entity().clone()
            }
            None => resolved.entity.clone(),
        };
        self.after_write(&resolved.thread).await;
        Ok(entity)
    }

    // -----------------------------------------------------------------------
    // Bulk review
    // -----------------------------------------------------------------------

    fn task_carrying(&self, suggestion: Uuid) -> Option<u64> {
        self.cache.as_ref()?.tasks().iter().find_map(|t| {
            let task = t.task.as_ref()?;
            (task.suggestion.as_ref()?.id == suggestion).then_some(task.id)
        })
    }

    /// Accept the newest pending suggestion of `kind` per target, one task at
    /// a time. Stops at the first failure; tasks accepted before it stay
    /// accepted. Returns how many were accepted.
    pub async fn accept_all(&mut self, kind: SuggestionType) -> Result<usize> {
        let mut accepted = 0;
        for id in self.suggestions.accept_targets(kind) {
            let Some(task_id) = self.task_carrying(id) else {
                continue;
            };
            self.accept_suggestion(task_id).await?;
            accepted += 1;
        }
        tracing::info!(%kind, accepted, "bulk accept finished");
        Ok(accepted)
    }

    /// Reject every pending suggestion of `kind`, closing each task with
    /// `comment`.
    pub async fn reject_all(&mut self, kind: SuggestionType, comment: &str) -> Result<usize> {
        if !guard::can_submit_comment(comment) {
            return Err(FeedError::Policy(CLOSE_WITHOUT_COMMENT.to_string()));
        }
        let mut rejected = 0;
        for id in self.suggestions.reject_targets(kind) {
            let Some(task_id) = self.task_carrying(id) else {
                continue;
            };
            self.reject_suggestion(task_id, comment).await?;
            rejected += 1;
        }
        tracing::info!(%kind, rejected, "bulk reject finished");
        Ok(rejected)
    }
}
