//! Incident list filter and the query string it round-trips through.

use crate::clock::days_before;
use crate::error::{FeedError, Result};
use crate::incident::ResolutionStatus;
use crate::types::ResolutionStatusType;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub const DEFAULT_RANGE_DAYS: u32 = 30;

// ---------------------------------------------------------------------------
// IncidentFilter
// ---------------------------------------------------------------------------

/// User-chosen filter over resolution statuses. Serializes to the URL query
/// string of the incident list.
///
/// Fields are private so every value holds the parser's invariants: blank
/// strings are absent and the range is never inverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentFilter {
    start_ts: i64,
    end_ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_case_resolution_status_type: Option<ResolutionStatusType>,
    #[serde(rename = "testCaseFQN", skip_serializing_if = "Option::is_none")]
    test_case_fqn: Option<String>,
    #[serde(rename = "originEntityFQN", skip_serializing_if = "Option::is_none")]
    origin_entity_fqn: Option<String>,
}

/// Query string shape before defaults are filled in.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFilter {
    start_ts: Option<i64>,
    end_ts: Option<i64>,
    assignee: Option<String>,
    test_case_resolution_status_type: Option<ResolutionStatusType>,
    #[serde(rename = "testCaseFQN")]
    test_case_fqn: Option<String>,
    #[serde(rename = "originEntityFQN")]
    origin_entity_fqn: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn check_range(start_ts: i64, end_ts: i64) -> Result<()> {
    if start_ts > end_ts {
        return Err(FeedError::InvalidQuery(format!(
            "startTs {start_ts} is after endTs {end_ts}"
        )));
    }
    Ok(())
}

impl IncidentFilter {
    /// The last `days` days ending at `now`.
    pub fn last_days(now: i64, days: u32) -> Self {
        Self {
            start_ts: days_before(now, days),
            end_ts: now,
            assignee: None,
            test_case_resolution_status_type: None,
            test_case_fqn: None,
            origin_entity_fqn: None,
        }
    }

    /// Everything between two timestamps, inclusive.
    pub fn between(start_ts: i64, end_ts: i64) -> Result<Self> {
        check_range(start_ts, end_ts)?;
        Ok(Self {
            start_ts,
            ..Self::last_days(end_ts, 0)
        })
    }

    /// Parse a query string (with or without the leading `?`). Missing time
    /// bounds default to the last 30 days; unrelated keys are ignored.
    pub fn from_query(query: &str, now: i64) -> Result<Self> {
        Self::from_query_with_range(query, now, DEFAULT_RANGE_DAYS)
    }

    pub fn from_query_with_range(query: &str, now: i64, days: u32) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let raw: RawFilter = serde_urlencoded::from_str(query)
            .map_err(|e| FeedError::InvalidQuery(e.to_string()))?;
        let end_ts = raw.end_ts.unwrap_or(now);
        let start_ts = raw.start_ts.unwrap_or_else(|| days_before(end_ts, days));
        Ok(Self::between(start_ts, end_ts)?
            .with_assignee(raw.assignee)
            .with_status(raw.test_case_resolution_status_type)
            .with_test_case(raw.test_case_fqn)
            .with_origin(raw.origin_entity_fqn))
    }

    pub fn to_query(&self) -> String {
        // Every field is a scalar, which serde_urlencoded always accepts.
        serde_urlencoded::to_string(self).unwrap_or_default()
    }

    pub fn start_ts(&self) -> i64 {
        self.start_ts
    }

    pub fn end_ts(&self) -> i64 {
        self.end_ts
    }

    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    pub fn status(&self) -> Option<ResolutionStatusType> {
        self.test_case_resolution_status_type
    }

    pub fn test_case_fqn(&self) -> Option<&str> {
        self.test_case_fqn.as_deref()
    }

    pub fn origin_entity_fqn(&self) -> Option<&str> {
        self.origin_entity_fqn.as_deref()
    }

    /// A blank name clears the assignee.
    pub fn with_assignee(mut self, assignee: Option<String>) -> Self {
        self.assignee = non_empty(assignee);
        self
    }

    pub fn with_status(mut self, status: Option<ResolutionStatusType>) -> Self {
        self.test_case_resolution_status_type = status;
        self
    }

    pub fn with_test_case(mut self, fqn: Option<String>) -> Self {
        self.test_case_fqn = non_empty(fqn);
        self
    }

    pub fn with_origin(mut self, fqn: Option<String>) -> Self {
        self.origin_entity_fqn = non_empty(fqn);
        self
    }

    /// Update the time range. Returns false when it is unchanged, so callers
    /// can skip the refetch.
    pub fn set_range(&mut self, start_ts: i64, end_ts: i64) -> Result<bool> {
        check_range(start_ts, end_ts)?;
        if self.start_ts == start_ts && self.end_ts == end_ts {
            return Ok(false);
        }
        self.start_ts = start_ts;
        self.end_ts = end_ts;
        Ok(true)
    }

    pub fn matches(&self, status: &ResolutionStatus) -> bool {
        if status.timestamp < self.start_ts || status.timestamp > self.end_ts {
            return false;
        }
        if let Some(kind) = self.test_case_resolution_status_type {
            if status.test_case_resolution_status_type != kind {
                return false;
            }
        }
        if let Some(name) = &self.assignee {
            if status.assignee().map(|a| a.name.as_str()) != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(fqn) = &self.test_case_fqn {
            if status.test_case_reference.fqn() != fqn {
                return false;
            }
        }
        if let Some(origin) = &self.origin_entity_fqn {
            let tc = status.test_case_reference.fqn();
            if !(tc == origin || tc.starts_with(&format!("{origin}."))) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Cursors
// ---------------------------------------------------------------------------

/// Opaque cursor for a page starting at `offset`.
pub fn encode_cursor(offset: usize) -> String {
    URL_SAFE_NO_PAD.encode(offset.to_string())
}

pub fn decode_cursor(cursor: &str) -> Result<usize> {
    let invalid = || FeedError::InvalidQuery(format!("invalid cursor '{cursor}'"));
    let bytes = URL_SAFE_NO_PAD.decode(cursor).map_err(|_| invalid())?;
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Before(String),
    After(String),
}

// ---------------------------------------------------------------------------
// ListQuery
// ---------------------------------------------------------------------------

/// Full request for one page of resolution statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: IncidentFilter,
    pub limit: usize,
    pub latest: bool,
    pub offset: Option<usize>,
    pub before: Option<String>,
    pub after: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PageParams {
    limit: Option<usize>,
    latest: Option<bool>,
    offset: Option<usize>,
    before: Option<String>,
    after: Option<String>,
}

impl ListQuery {
    /// First page of the latest status per test case.
    pub fn latest(filter: IncidentFilter, limit: usize) -> Self {
        Self {
            filter,
            limit,
            latest: true,
            offset: None,
            before: None,
            after: None,
        }
    }

    /// Parse a list request. The filter and paging keys share one query
    /// string.
    pub fn from_query(query: &str, now: i64, default_limit: usize) -> Result<Self> {
        let filter = IncidentFilter::from_query(query, now)?;
        let query = query.strip_prefix('?').unwrap_or(query);
        let page: PageParams = serde_urlencoded::from_str(query)
            .map_err(|e| FeedError::InvalidQuery(e.to_string()))?;
        Ok(Self {
            filter,
            limit: page.limit.unwrap_or(default_limit),
            latest: page.latest.unwrap_or(false),
            offset: page.offset,
            before: non_empty(page.before),
            after: non_empty(page.after),
        })
    }

    pub fn with_cursor(mut self, cursor: Option<Cursor>) -> Self {
        match cursor {
            Some(Cursor::Before(c)) => self.before = Some(c),
            Some(Cursor::After(c)) => self.after = Some(c),
            None => {}
        }
        self
    }

    /// Starting row, from whichever cursor is present.
    pub fn start(&self) -> Result<usize> {
        match (&self.before, &self.after) {
            (Some(_), Some(_)) => Err(FeedError::InvalidQuery(
                "only one of before and after may be given".to_string(),
            )),
            (Some(c), None) | (None, Some(c)) => decode_cursor(c),
            (None, None) => Ok(self.offset.unwrap_or(0)),
        }
    }

    /// Query pairs in wire order for an HTTP client.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let f = &self.filter;
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("latest", self.latest.to_string()),
        ];
        if let Some(origin) = &f.origin_entity_fqn {
            pairs.push(("originEntityFQN", origin.clone()));
        }
        pairs.push(("startTs", f.start_ts.to_string()));
        pairs.push(("endTs", f.end_ts.to_string()));
        if let Some(a) = &f.assignee {
            pairs.push(("assignee", a.clone()));
        }
        if let Some(t) = f.test_case_resolution_status_type {
            pairs.push(("testCaseResolutionStatusType", t.to_string()));
        }
        if let Some(fqn) = &f.test_case_fqn {
            pairs.push(("testCaseFQN", fqn.clone()));
        }
        if let Some(o) = self.offset {
            pairs.push(("offset", o.to_string()));
        }
        if let Some(b) = &self.before {
            pairs.push(("before", b.clone()));
        }
        if let Some(a) = &self.after {
            pairs.push(("after", a.clone()));
        }
        pairs
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
