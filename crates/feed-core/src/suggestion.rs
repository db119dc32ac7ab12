use crate::entity::TagLabel;
use crate::entity_link::{EntityKey, EntityLink};
use crate::error::{FeedError, Result};
use crate::types::{SuggestionStatus, SuggestionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SuggestedValue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SuggestedValue {
    Description(String),
    TagLabels(Vec<TagLabel>),
}

impl SuggestedValue {
    pub fn suggestion_type(&self) -> SuggestionType {
        match self {
            SuggestedValue::Description(_) => SuggestionType::Description,
            SuggestedValue::TagLabels(_) => SuggestionType::Tags,
        }
    }

    /// Flat text form sent as a task's `newValue`.
    pub fn as_text(&self) -> String {
        match self {
            SuggestedValue::Description(d) => d.clone(),
            SuggestedValue::TagLabels(tags) => tags
                .iter()
                .map(|t| t.tag_fqn.as_str())
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

// ---------------------------------------------------------------------------
// Suggestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub suggestion_type: SuggestionType,
    pub entity_link: EntityLink,
    pub value: SuggestedValue,
    pub status: SuggestionStatus,
    pub created_by: String,
    pub updated_at: i64,
}

impl Suggestion {
    pub fn new(
        entity_link: EntityLink,
        value: SuggestedValue,
        created_by: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            suggestion_type: value.suggestion_type(),
            entity_link,
            value,
            status: SuggestionStatus::Pending,
            created_by: created_by.into(),
            updated_at: now,
        }
    }

    pub fn key(&self) -> EntityKey {
        self.entity_link.key()
    }

    pub fn is_pending(&self) -> bool {
        self.status == SuggestionStatus::Pending
    }

    /// Mark accepted. Accepting an accepted suggestion is a no-op; a rejected
    /// one cannot be revived.
    pub fn accept(&mut self, now: i64) -> Result<()> {
        match self.status {
            SuggestionStatus::Pending => {
                self.status = SuggestionStatus::Accepted;
                self.updated_at = now;
                Ok(())
            }
            SuggestionStatus::Accepted => Ok(()),
            SuggestionStatus::Rejected => Err(FeedError::InvalidTransition {
                from: self.status.to_string(),
                to: SuggestionStatus::Accepted.to_string(),
                reason: "suggestion was already rejected".to_string(),
            }),
        }
    }

    pub fn reject(&mut self, now: i64) -> Result<()> {
        match self.status {
            SuggestionStatus::Pending => {
                self.status = SuggestionStatus::Rejected;
                self.updated_at = now;
                Ok(())
            }
            SuggestionStatus::Rejected => Ok(()),
            SuggestionStatus::Accepted => Err(FeedError::InvalidTransition {
                from: self.status.to_string(),
                to: SuggestionStatus::Rejected.to_string(),
                reason: "suggestion was already accepted".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// SuggestionBoard
// ---------------------------------------------------------------------------

/// Suggestions for one entity, grouped by author, with an optional active
/// author whose suggestions are being reviewed.
#[derive(Debug, Clone, Default)]
pub struct SuggestionBoard {
    suggestions: Vec<Suggestion>,
    active_user: Option<String>,
}

impl SuggestionBoard {
    pub fn new(mut suggestions: Vec<Suggestion>) -> Self {
        suggestions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Self {
            suggestions,
            active_user: None,
        }
    }

    pub fn all(&self) -> &[Suggestion] {
        &self.suggestions
    }

    /// The single actionable suggestion for `(key, kind)`: the most recent
    /// pending one.
    pub fn actionable(&self, key: &EntityKey, kind: SuggestionType) -> Option<&Suggestion> {
        self.suggestions
            .iter()
            .filter(|s| s.is_pending() && s.suggestion_type == kind && &s.key() == key)
            .max_by_key(|s| s.updated_at)
    }

    pub fn by_user(&self) -> BTreeMap<&str, Vec<&Suggestion>> {
        let mut map: BTreeMap<&str, Vec<&Suggestion>> = BTreeMap::new();
        for s in &self.suggestions {
            map.entry(s.created_by.as_str()).or_default().push(s);
        }
        map
    }

    /// Authors with at least one suggestion, sorted.
    pub fn users(&self) -> Vec<&str> {
        self.by_user().into_keys().collect()
    }

    pub fn set_active_user(&mut self, user: Option<String>) {
        self.active_user = user;
    }

    pub fn active_user(&self) -> Option<&str> {
        self.active_user.as_deref()
    }

    /// Suggestions of the active user, or all of them when none is selected.
    pub fn selected(&self) -> Vec<&Suggestion> {
        match &self.active_user {
            Some(user) => self.suggestions.iter().filter(|s| &s.created_by == user).collect(),
            None => self.suggestions.iter().collect(),
        }
    }

    /// Swap in a freshly read set, keeping the active author.
    pub fn replace_all(&mut self, mut suggestions: Vec<Suggestion>) {
        suggestions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.suggestions = suggestions;
    }

    /// Record a suggestion as the server returned it.
    pub fn upsert(&mut self, suggestion: Suggestion) {
        match self.suggestions.iter_mut().find(|s| s.id == suggestion.id) {
            Some(existing) => *existing = suggestion,
            None => self.suggestions.insert(0, suggestion),
        }
    }

    /// Pending suggestions of `kind` among the selected ones that an
    /// accept-all would take: the newest per target.
    pub fn accept_targets(&self, kind: SuggestionType) -> Vec<Uuid> {
        self.pending_ids(kind)
    }

    /// Every selected pending suggestion of `kind`.
    pub fn reject_targets(&self, kind: SuggestionType) -> Vec<Uuid> {
        self.selected()
            .into_iter()
            .filter(|s| s.is_pending() && s.suggestion_type == kind)
            .map(|s| s.id)
            .collect()
    }

    fn pending_ids(&self, kind: SuggestionType) -> Vec<Uuid> {
        let mut newest: BTreeMap<EntityKey, &Suggestion> = BTreeMap::new();
        for s in self
            .selected()
            .into_iter()
            .filter(|s| s.is_pending() && s.suggestion_type == kind)
        {
            let entry = newest.entry(s.key()).or_insert(s);
            if s.updated_at > entry.updated_at {
                *entry = s;
            }
        }
        newest.values().map(|s| s.id).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
