//! Canonical entity links.
//!
//! The backend addresses an entity, or a field of one of its columns, with a
//! string such as `<#E::table::svc.db.schema.orders::columns::id::description>`.
//! Inside the crate that string is parsed once into an [`EntityLink`], and
//! matching is done on the typed [`EntityKey`] it exposes.

use crate::error::{FeedError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

const SEPARATOR: &str = "::";
const COLUMNS: &str = "columns";

static LINK_RE: OnceLock<Regex> = OnceLock::new();

fn link_re() -> &'static Regex {
    LINK_RE.get_or_init(|| {
        Regex::new(r"^<#E::(?P<etype>[A-Za-z][A-Za-z0-9]*)::(?P<rest>[^>]+)>$").unwrap()
    })
}

/// Stable identity of an entity or one of its columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub entity_fqn: String,
    /// Column path, with nested children joined by `.`.
    pub column: Option<String>,
}

impl EntityKey {
    pub fn entity(fqn: impl Into<String>) -> Self {
        Self {
            entity_fqn: fqn.into(),
            column: None,
        }
    }

    pub fn column(fqn: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            entity_fqn: fqn.into(),
            column: Some(column.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityLink {
    pub entity_type: String,
    pub entity_fqn: String,
    pub column: Option<String>,
    pub field: Option<String>,
}

impl EntityLink {
    pub fn entity(entity_type: impl Into<String>, fqn: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_fqn: fqn.into(),
            column: None,
            field: None,
        }
    }

    pub fn table(fqn: impl Into<String>) -> Self {
        Self::entity("table", fqn)
    }

    /// Link to one field of a table column, the shape the backend uses for
    /// column-level tasks.
    pub fn table_column(
        fqn: impl Into<String>,
        column: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: "table".to_string(),
            entity_fqn: fqn.into(),
            column: Some(column.into()),
            field: Some(field.into()),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn key(&self) -> EntityKey {
        EntityKey {
            entity_fqn: self.entity_fqn.clone(),
            column: self.column.clone(),
        }
    }

    /// The same link with column and field stripped.
    pub fn entity_link(&self) -> EntityLink {
        EntityLink::entity(self.entity_type.clone(), self.entity_fqn.clone())
    }

    pub fn is_column(&self) -> bool {
        self.column.is_some()
    }

    /// Whether `other` addresses this entity or anything inside it.
    pub fn contains(&self, other: &EntityLink) -> bool {
        self.entity_type == other.entity_type && self.entity_fqn == other.entity_fqn
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || FeedError::InvalidEntityLink(s.to_string());
        let caps = link_re().captures(s.trim()).ok_or_else(invalid)?;
        let entity_type = caps["etype"].to_string();
        let mut parts = caps["rest"].split(SEPARATOR);

        let entity_fqn = match parts.next() {
            Some(fqn) if !fqn.is_empty() => fqn.to_string(),
            _ => return Err(invalid()),
        };
        let rest: Vec<&str> = parts.collect();
        if rest.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let (column, field) = match rest.as_slice() {
            [] => (None, None),
            [COLUMNS] => return Err(invalid()),
            [COLUMNS, column] => (Some(column.to_string()), None),
            [COLUMNS, column, field] => (Some(column.to_string()), Some(field.to_string())),
            [field] => (None, Some(field.to_string())),
            _ => return Err(invalid()),
        };

        Ok(Self {
            entity_type,
            entity_fqn,
            column,
            field,
        })
    }
}

impl fmt::Display for EntityLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<#E::{}::{}", self.entity_type, self.entity_fqn)?;
        if let Some(column) = &self.column {
            write!(f, "{SEPARATOR}{COLUMNS}{SEPARATOR}{column}")?;
        }
        if let Some(field) = &self.field {
            write!(f, "{SEPARATOR}{field}")?;
        }
        f.write_str(">")
    }
}

impl FromStr for EntityLink {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        EntityLink::parse(s)
    }
}

impl TryFrom<String> for EntityLink {
    type Error = FeedError;

    fn try_from(s: String) -> Result<Self> {
        EntityLink::parse(&s)
    }
}

impl From<EntityLink> for String {
    fn from(link: EntityLink) -> Self {
        link.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FQN: &str = "sample_data.ecommerce_db.shopify.dim_address";

    #[test]
    fn parses_entity_link() {
        let link: EntityLink = format!("<#E::table::{FQN}>").parse().unwrap();
        assert_eq!(link.entity_type, "table");
        assert_eq!(link.entity_fqn, FQN);
        assert_eq!(link.column, None);
        assert_eq!(link.key(), EntityKey::entity(FQN));
    }

    #[test]
    fn parses_column_field_link() {
        let s = format!("<#E::table::{FQN}::columns::address_id::description>");
        let link = EntityLink::parse(&s).unwrap();
        assert_eq!(link.column.as_deref(), Some("address_id"));
        assert_eq!(link.field.as_deref(), Some("description"));
        assert_eq!(link.to_string(), s);
    }

    #[test]
    fn parses_entity_field_link() {
        let link = EntityLink::parse(&format!("<#E::table::{FQN}::tags>")).unwrap();
        assert_eq!(link.column, None);
        assert_eq!(link.field.as_deref(), Some("tags"));
    }

    #[test]
    fn rejects_malformed_links() {
        for bad in [
            "",
            "table::x",
            "<#E::table::>",
            "<#E::::x>",
            "<#E::table::x::columns>",
            "<#E::table::x::columns::>",
            "<#E::table::x::a::b::c::d>",
            "<#E::table::x",
        ] {
            assert!(EntityLink::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn column_link_and_field_share_key() {
        let a = EntityLink::table_column(FQN, "address_id", "description");
        let b = EntityLink::table_column(FQN, "address_id", "tags");
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), EntityLink::table(FQN).key());
    }

    #[test]
    fn serde_uses_wire_string() {
        let link = EntityLink::table(FQN);
        let json = serde_json::to_string(&link).unwrap();
        assert_eq!(json, format!("\"<#E::table::{FQN}>\""));
        let back: EntityLink = serde_json::from_str(&json).unwrap();
        assert_eq!(back, link);
        assert!(serde_json::from_str::<EntityLink>("\"nope\"").is_err());
    }

    #[test]
    fn contains_column_links() {
        let table = EntityLink::table(FQN);
        assert!(table.contains(&EntityLink::table_column(FQN, "id", "description")));
        assert!(!table.contains(&EntityLink::table("other.table")));
    }
}
