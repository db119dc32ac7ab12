use crate::entity_link::{EntityKey, EntityLink};
use crate::reference::ActorRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// TagLabel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagSource {
    Classification,
    Glossary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    Manual,
    Propagated,
    Automated,
    Derived,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLabel {
    #[serde(rename = "tagFQN")]
    pub tag_fqn: String,
    pub source: TagSource,
    pub label_type: LabelType,
}

impl TagLabel {
    pub fn classification(tag_fqn: impl Into<String>) -> Self {
        Self {
            tag_fqn: tag_fqn.into(),
            source: TagSource::Classification,
            label_type: LabelType::Manual,
        }
    }

    pub fn glossary(term_fqn: impl Into<String>) -> Self {
        Self {
            tag_fqn: term_fqn.into(),
            source: TagSource::Glossary,
            label_type: LabelType::Manual,
        }
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagLabel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Column>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            description: None,
            tags: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Column>) -> Self {
        self.children = children;
        self
    }
}

// ---------------------------------------------------------------------------
// CatalogEntity
// ---------------------------------------------------------------------------

/// The cached view of a catalog entity (a table, in practice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntity {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub entity_type: String,
    pub name: String,
    pub fully_qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagLabel>,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub owners: Vec<ActorRef>,
    #[serde(default = "initial_version")]
    pub version: f64,
}

fn initial_version() -> f64 {
    0.1
}

impl CatalogEntity {
    pub fn table(fqn: impl Into<String>, columns: Vec<Column>) -> Self {
        let fqn = fqn.into();
        let name = fqn.rsplit('.').next().unwrap_or(&fqn).to_string();
        Self {
            id: Uuid::new_v4(),
            entity_type: "table".to_string(),
            name,
            fully_qualified_name: fqn,
            description: None,
            tags: Vec::new(),
            columns,
            owners: Vec::new(),
            version: initial_version(),
        }
    }

    pub fn link(&self) -> EntityLink {
        EntityLink::entity(self.entity_type.clone(), self.fully_qualified_name.clone())
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::entity(self.fully_qualified_name.clone())
    }

    /// Key of the column at `path`, built the same way a column link is.
    pub fn column_key(&self, path: &str) -> EntityKey {
        EntityLink::table_column(self.fully_qualified_name.clone(), path, "description").key()
    }

    /// Every column path, nested children joined by `.`.
    pub fn column_paths(&self) -> Vec<String> {
        fn walk(columns: &[Column], prefix: &str, out: &mut Vec<String>) {
            for col in columns {
                let path = join_path(prefix, &col.name);
                walk(&col.children, &path, out);
                out.push(path);
            }
        }
        let mut out = Vec::new();
        walk(&self.columns, "", &mut out);
        out
    }

    pub fn column(&self, path: &str) -> Option<&Column> {
        find_column(&self.columns, "", path)
    }

    pub fn column_mut(&mut self, path: &str) -> Option<&mut Column> {
        find_column_mut(&mut self.columns, "", path)
    }

    /// Minor version bump applied on every accepted change.
    pub fn bump_version(&mut self) {
        self.version = ((self.version + 0.1) * 10.0).round() / 10.0;
    }

    pub fn is_owner(&self, actor: &ActorRef) -> bool {
        self.owners.iter().any(|o| o.is_same(actor))
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn find_column<'a>(columns: &'a [Column], prefix: &str, target: &str) -> Option<&'a Column> {
    for col in columns {
        let path = join_path(prefix, &col.name);
        if path == target {
            return Some(col);
        }
        if let Some(found) = find_column(&col.children, &path, target) {
            return Some(found);
        }
    }
    None
}

fn find_column_mut<'a>(
    columns: &'a mut [Column],
    prefix: &str,
    target: &str,
) -> Option<&'a mut Column> {
    for col in columns.iter_mut() {
        let path = join_path(prefix, &col.name);
        if path == target {
            return Some(col);
        }
        if let Some(found) = find_column_mut(&mut col.children, &path, target) {
            return Some(found);
        }
    }
    None
}
