use crate::http::FeedApi;
use feed_core::config::IncidentConfig;
use feed_core::filter::{IncidentFilter, ListQuery};
use feed_core::generation::Ticket;
use feed_core::incident::{AssigneeOption, IncidentBoard, IncidentChange, ResolutionStatus};
use feed_core::reference::{ActorRef, ActorType};
use feed_core::types::Severity;
use feed_core::wire::{SearchHit, SearchIndex};
use feed_core::Result;
use uuid::Uuid;

/// The incident list: URL-driven filter, cursor paging and row updates.
pub struct IncidentManager {
    api: FeedApi,
    board: IncidentBoard,
}

impl IncidentManager {
    pub fn new(api: FeedApi, filter: IncidentFilter, page_size: usize) -> Self {
        Self {
            api,
            board: IncidentBoard::new(filter, page_size),
        }
    }

    /// Restore the list from a URL query string. Missing range bounds fall
    /// back to the configured default window ending at `now`.
    pub fn from_url(api: FeedApi, query: &str, now: i64, config: &IncidentConfig) -> Result<Self> {
        let filter = IncidentFilter::from_query_with_range(query, now, config.default_range_days)?;
        Ok(Self::new(api, filter, config.page_size))
    }

    pub fn board(&self) -> &IncidentBoard {
        &self.board
    }

    /// Query string that reproduces the current filter.
    pub fn url_query(&self) -> String {
        self.board.filter().to_query()
    }

    // -----------------------------------------------------------------------
    // Paging
    // -----------------------------------------------------------------------

    /// Returns false when the page arrived after a newer query was issued.
    async fn fetch(&mut self, ticket: Ticket, query: ListQuery) -> Result<bool> {
        let page = self.api.list_incidents(&query).await?;
        let applied = self.board.apply_page(ticket, page);
        if !applied {
            tracing::debug!("discarded stale incident page");
        }
        Ok(applied)
    }

    pub async fn load(&mut self) -> Result<bool> {
        let (ticket, query) = self.board.reload();
        self.fetch(ticket, query).await
    }

    pub async fn set_filter(&mut self, filter: IncidentFilter) -> Result<bool> {
        let (ticket, query) = self.board.set_filter(filter);
        self.fetch(ticket, query).await
    }

    pub async fn set_page_size(&mut self, page_size: usize) -> Result<bool> {
        let (ticket, query) = self.board.set_page_size(page_size);
        self.fetch(ticket, query).await
    }

    /// Returns false when already on the last page.
    pub async fn next_page(&mut self) -> Result<bool> {
        match self.board.next_page() {
            Some((ticket, query)) => self.fetch(ticket, query).await,
            None => Ok(false),
        }
    }

    pub async fn previous_page(&mut self) -> Result<bool> {
        match self.board.previous_page() {
            Some((ticket, query)) => self.fetch(ticket, query).await,
            None => Ok(false),
        }
    }

    // -----------------------------------------------------------------------
    // Row updates
    // -----------------------------------------------------------------------

    pub async fn update_severity(
        &mut self,
        id: Uuid,
        severity: Option<Severity>,
    ) -> Result<ResolutionStatus> {
        self.apply_change(id, IncidentChange::Severity(severity)).await
    }

    pub async fn assign(&mut self, id: Uuid, assignee: ActorRef) -> Result<ResolutionStatus> {
        self.apply_change(id, IncidentChange::Assignee(assignee)).await
    }

    /// Send the diff for one row; the row is replaced only by the server's
    /// record and left as it was on failure.
    async fn apply_change(&mut self, id: Uuid, change: IncidentChange) -> Result<ResolutionStatus> {
        let pending = self.board.begin_patch(id, &change)?;
        match self.api.patch_incident(id, &pending.ops).await {
            Ok(record) => {
                tracing::info!(incident = %id, ops = pending.ops.len(), "incident updated");
                self.board.confirm_patch(record.clone());
                Ok(record)
            }
            Err(e) => {
                self.board.abandon_patch();
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Pickers
    // -----------------------------------------------------------------------

    /// Users and teams matching `q`, searched concurrently.
    pub async fn search_assignees(&self, q: &str) -> Result<Vec<AssigneeOption>> {
        let (users, teams) = tokio::join!(
            self.api.search(q, SearchIndex::User),
            self.api.search(q, SearchIndex::Team)
        );
        let option = |hit: SearchHit, actor_type: ActorType| AssigneeOption {
            label: hit.label().to_string(),
            value: hit.name,
            actor_type,
        };
        let mut options: Vec<AssigneeOption> = users?
            .hits
            .into_iter()
            .map(|h| option(h, ActorType::User))
            .collect();
        options.extend(teams?.hits.into_iter().map(|h| option(h, ActorType::Team)));
        Ok(options)
    }

    pub async fn search_test_cases(&self, q: &str) -> Result<Vec<SearchHit>> {
        Ok(self.api.search(q, SearchIndex::TestCase).await?.hits)
    }
}
