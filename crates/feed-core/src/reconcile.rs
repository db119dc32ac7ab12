use crate::entity::{CatalogEntity, TagLabel};
use crate::error::{FeedError, Result};
use crate::suggestion::{SuggestedValue, Suggestion};
use crate::types::SuggestionStatus;

/// Where an accepted suggestion landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Entity,
    Column(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub target: Target,
    /// False when the field already held the suggested value.
    pub changed: bool,
}

/// Fold an accepted suggestion into `entity`.
///
/// The column is found by comparing each column's key with the suggestion's
/// key, nested columns included. A column key that matches nothing falls
/// back to the entity itself. Applying the same suggestion again is a no-op.
pub fn apply(entity: &mut CatalogEntity, suggestion: &Suggestion) -> Result<Applied> {
    if suggestion.status != SuggestionStatus::Accepted {
        return Err(FeedError::Validation(format!(
            "suggestion {} is {}, only accepted suggestions are merged",
            suggestion.id, suggestion.status
        )));
    }
    let key = suggestion.key();
    if key.entity_fqn != entity.fully_qualified_name {
        return Err(FeedError::Validation(format!(
            "suggestion targets '{}', not '{}'",
            key.entity_fqn, entity.fully_qualified_name
        )));
    }

    let path = entity
        .column_paths()
        .into_iter()
        .find(|p| entity.column_key(p) == key);

    let applied = match path {
        Some(path) => {
            let changed = match entity.column_mut(&path) {
                Some(col) => set_field(&mut col.description, &mut col.tags, &suggestion.value),
                None => false,
            };
            Applied {
                target: Target::Column(path),
                changed,
            }
        }
        None => Applied {
            target: Target::Entity,
            changed: set_field(&mut entity.description, &mut entity.tags, &suggestion.value),
        },
    };
    Ok(applied)
}

fn set_field(
    description: &mut Option<String>,
    tags: &mut Vec<TagLabel>,
    value: &SuggestedValue,
) -> bool {
    match value {
        SuggestedValue::Description(text) => {
            if description.as_deref() == Some(text.as_str()) {
                return false;
            }
            *description = Some(text.clone());
            true
        }
        SuggestedValue::TagLabels(labels) => {
            let mut next: Vec<TagLabel> = Vec::with_capacity(labels.len());
            for l in labels {
                if !next.iter().any(|t| t.tag_fqn == l.tag_fqn) {
                    next.push(l.clone());
                }
            }
            if *tags == next {
                return false;
            }
            *tags = next;
            true
        }
    }
}
