use crate::error::{FeedError, Result};
use crate::filter::{Cursor, IncidentFilter, ListQuery};
use crate::generation::{RequestGeneration, Ticket};
use crate::patch::{self, PatchOp};
use crate::reference::{ActorRef, ActorType, EntityRef};
use crate::types::{ResolutionStatusType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ResolutionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<ActorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<ActorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_failure_comment: Option<String>,
}

/// One record in an incident's history. A later record with the same
/// `state_id` supersedes it; nothing is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStatus {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default = "Uuid::new_v4")]
    pub state_id: Uuid,
    pub test_case_reference: EntityRef,
    pub test_case_resolution_status_type: ResolutionStatusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_resolution_status_details: Option<ResolutionDetails>,
    pub timestamp: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl ResolutionStatus {
    /// A fresh incident for a failing test case.
    pub fn new_incident(test_case: EntityRef, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            state_id: Uuid::new_v4(),
            test_case_reference: test_case,
            test_case_resolution_status_type: ResolutionStatusType::New,
            severity: None,
            test_case_resolution_status_details: None,
            timestamp: now,
            updated_at: now,
            updated_by: None,
        }
    }

    pub fn assignee(&self) -> Option<&ActorRef> {
        self.test_case_resolution_status_details
            .as_ref()
            .and_then(|d| d.assignee.as_ref())
    }

    /// Follow-up record in the same incident.
    pub fn supersede(&self, status_type: ResolutionStatusType, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_case_resolution_status_type: status_type,
            timestamp: now,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// A single-field edit of a listed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncidentChange {
    Severity(Option<Severity>),
    /// Setting an assignee also moves the record to `Assigned`.
    Assignee(ActorRef),
}

impl IncidentChange {
    pub fn applied_to(&self, record: &ResolutionStatus) -> ResolutionStatus {
        let mut updated = record.clone();
        match self {
            IncidentChange::Severity(sev) => updated.severity = *sev,
            IncidentChange::Assignee(actor) => {
                updated
                    .test_case_resolution_status_details
                    .get_or_insert_with(ResolutionDetails::default)
                    .assignee = Some(actor.clone());
                updated.test_case_resolution_status_type = ResolutionStatusType::Assigned;
            }
        }
        updated
    }
}

/// JSON patch turning `record` into `updated`.
pub fn patch_for(record: &ResolutionStatus, updated: &ResolutionStatus) -> Result<Vec<PatchOp>> {
    let from = serde_json::to_value(record)?;
    let to = serde_json::to_value(updated)?;
    Ok(patch::diff(&from, &to))
}

/// Apply a JSON patch to a record. Identity fields are not patchable.
pub fn apply_patch(record: &ResolutionStatus, ops: &[PatchOp]) -> Result<ResolutionStatus> {
    if let Some(op) = ops
        .iter()
        .find(|op| matches!(op.path(), "/id" | "/stateId" | "/testCaseReference"))
    {
        return Err(FeedError::Validation(format!(
            "'{}' cannot be patched",
            op.path()
        )));
    }
    let mut doc = serde_json::to_value(record)?;
    patch::apply(&mut doc, ops)?;
    Ok(serde_json::from_value(doc)?)
}

/// Most recent record per test case, newest first.
pub fn latest_per_test_case(records: &[ResolutionStatus]) -> Vec<ResolutionStatus> {
    let mut latest: HashMap<&str, &ResolutionStatus> = HashMap::new();
    for r in records {
        let entry = latest.entry(r.test_case_reference.fqn()).or_insert(r);
        if r.timestamp > entry.timestamp {
            *entry = r;
        }
    }
    let mut out: Vec<ResolutionStatus> = latest.into_values().cloned().collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(a.id.cmp(&b.id)));
    out
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentPage {
    pub data: Vec<ResolutionStatus>,
    #[serde(default)]
    pub paging: Paging,
}

// ---------------------------------------------------------------------------
// Assignee options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeOption {
    pub label: String,
    pub value: String,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
}

impl From<&ActorRef> for AssigneeOption {
    fn from(a: &ActorRef) -> Self {
        Self {
            label: a.label().to_string(),
            value: a.name.clone(),
            actor_type: a.actor_type,
        }
    }
}

/// Distinct assignees of `rows`, first-seen order.
pub fn assignee_options(rows: &[ResolutionStatus]) -> Vec<AssigneeOption> {
    let mut out: Vec<AssigneeOption> = Vec::new();
    for a in rows.iter().filter_map(|r| r.assignee()) {
        if !out.iter().any(|o| o.value == a.name) {
            out.push(a.into());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// IncidentBoard
// ---------------------------------------------------------------------------

/// A patch sent to the server and not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPatch {
    pub id: Uuid,
    pub ops: Vec<PatchOp>,
}

/// Filter, page size and page number of a list request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListView {
    filter: IncidentFilter,
    page_size: usize,
    page: usize,
}

/// The visible incident list: current filter, page of rows, and the paging
/// cursors the server returned for it. Filter and page number only change
/// when the page requested for them is applied.
#[derive(Debug, Clone)]
pub struct IncidentBoard {
    view: ListView,
    requested: Option<(Ticket, ListView)>,
    rows: Vec<ResolutionStatus>,
    paging: Paging,
    generation: RequestGeneration,
    pending: Option<PendingPatch>,
}

impl IncidentBoard {
    pub fn new(filter: IncidentFilter, page_size: usize) -> Self {
        Self {
            view: ListView {
                filter,
                page_size: page_size.max(1),
                page: 1,
            },
            requested: None,
            rows: Vec::new(),
            paging: Paging::default(),
            generation: RequestGeneration::default(),
            pending: None,
        }
    }

    pub fn filter(&self) -> &IncidentFilter {
        &self.view.filter
    }

    pub fn rows(&self) -> &[ResolutionStatus] {
        &self.rows
    }

    pub fn paging(&self) -> &Paging {
        &self.paging
    }

    pub fn current_page(&self) -> usize {
        self.view.page
    }

    pub fn page_size(&self) -> usize {
        self.view.page_size
    }

    pub fn pending(&self) -> Option<&PendingPatch> {
        self.pending.as_ref()
    }

    pub fn assignee_options(&self) -> Vec<AssigneeOption> {
        assignee_options(&self.rows)
    }

    /// First page of the current filter.
    pub fn reload(&mut self) -> (Ticket, ListQuery) {
        let view = ListView {
            page: 1,
            ..self.view.clone()
        };
        self.request(view, None)
    }

    /// First page of `filter`.
    pub fn set_filter(&mut self, filter: IncidentFilter) -> (Ticket, ListQuery) {
        let view = ListView {
            filter,
            page_size: self.view.page_size,
            page: 1,
        };
        self.request(view, None)
    }

    pub fn set_page_size(&mut self, page_size: usize) -> (Ticket, ListQuery) {
        let view = ListView {
            filter: self.view.filter.clone(),
            page_size: page_size.max(1),
            page: 1,
        };
        self.request(view, None)
    }

    /// Query for the next page, if there is one.
    pub fn next_page(&mut self) -> Option<(Ticket, ListQuery)> {
        let after = self.paging.after.clone()?;
        let view = ListView {
            page: self.view.page + 1,
            ..self.view.clone()
        };
        Some(self.request(view, Some(Cursor::After(after))))
    }

    pub fn previous_page(&mut self) -> Option<(Ticket, ListQuery)> {
        let before = self.paging.before.clone()?;
        let view = ListView {
            page: self.view.page.saturating_sub(1).max(1),
            ..self.view.clone()
        };
        Some(self.request(view, Some(Cursor::Before(before))))
    }

    fn request(&mut self, view: ListView, cursor: Option<Cursor>) -> (Ticket, ListQuery) {
        let ticket = self.generation.issue();
        let query = ListQuery::latest(view.filter.clone(), view.page_size).with_cursor(cursor);
        self.requested = Some((ticket, view));
        (ticket, query)
    }

    /// Show a page and adopt the filter and page number it was requested
    /// for. Returns false, leaving the board unchanged, when a newer query
    /// has been issued since `ticket`.
    pub fn apply_page(&mut self, ticket: Ticket, page: IncidentPage) -> bool {
        if !self.generation.is_current(ticket) {
            return false;
        }
        match self.requested.take() {
            Some((t, view)) if t == ticket => self.view = view,
            other => self.requested = other,
        }
        self.rows = page.data;
        self.paging = page.paging;
        true
    }

    /// Prepare a partial update for one row. The row itself is untouched
    /// until [`confirm_patch`](Self::confirm_patch).
    pub fn begin_patch(&mut self, id: Uuid, change: &IncidentChange) -> Result<PendingPatch> {
        let row = self
            .rows
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| FeedError::IncidentNotFound(id.to_string()))?;
        let ops = patch_for(row, &change.applied_to(row))?;
        let pending = PendingPatch { id, ops };
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Replace the row with the server's record.
    pub fn confirm_patch(&mut self, record: ResolutionStatus) {
        if self.pending.as_ref().is_some_and(|p| p.id == record.id) {
            self.pending = None;
        }
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == record.id) {
            *row = record;
        }
    }

    pub fn abandon_patch(&mut self) {
        self.pending = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
