use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// TaskType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    RequestDescription,
    UpdateDescription,
    RequestTag,
    UpdateTag,
    Generic,
}

impl TaskType {
    pub fn all() -> &'static [TaskType] {
        &[
            TaskType::RequestDescription,
            TaskType::UpdateDescription,
            TaskType::RequestTag,
            TaskType::UpdateTag,
            TaskType::Generic,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::RequestDescription => "RequestDescription",
            TaskType::UpdateDescription => "UpdateDescription",
            TaskType::RequestTag => "RequestTag",
            TaskType::UpdateTag => "UpdateTag",
            TaskType::Generic => "Generic",
        }
    }

    /// The suggestion kind a task of this type carries, if any.
    pub fn suggestion_type(self) -> Option<SuggestionType> {
        match self {
            TaskType::RequestDescription | TaskType::UpdateDescription => {
                Some(SuggestionType::Description)
            }
            TaskType::RequestTag | TaskType::UpdateTag => Some(SuggestionType::Tags),
            TaskType::Generic => None,
        }
    }

    /// Operation an actor must hold to resolve or close a task of this type.
    pub fn edit_operation(self) -> Operation {
        match self.suggestion_type() {
            Some(SuggestionType::Description) => Operation::EditDescription,
            Some(SuggestionType::Tags) => Operation::EditTags,
            None => Operation::EditAll,
        }
    }

    /// Title shown for the task in a feed, e.g. "Request tags for".
    pub fn title_prefix(self) -> &'static str {
        match self {
            TaskType::RequestDescription => "Request to update description for",
            TaskType::UpdateDescription => "Update description for",
            TaskType::RequestTag => "Request tags for",
            TaskType::UpdateTag => "Update tags for",
            TaskType::Generic => "Task for",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FeedError::Validation(format!("unknown task type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Open,
    Closed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(TaskStatus::Open),
            "closed" => Ok(TaskStatus::Closed),
            _ => Err(FeedError::Validation(format!("unknown task status '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ThreadType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreadType {
    Conversation,
    Task,
    Announcement,
}

impl ThreadType {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadType::Conversation => "Conversation",
            ThreadType::Task => "Task",
            ThreadType::Announcement => "Announcement",
        }
    }
}

impl fmt::Display for ThreadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FeedFilter
// ---------------------------------------------------------------------------

/// Which slice of the feed a user asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedFilter {
    /// Tasks assigned to the user.
    Owner,
    /// Tasks the user created.
    AssignedBy,
    /// Threads mentioning the user.
    Mentions,
}

impl FeedFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedFilter::Owner => "OWNER",
            FeedFilter::AssignedBy => "ASSIGNED_BY",
            FeedFilter::Mentions => "MENTIONS",
        }
    }
}

impl fmt::Display for FeedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedFilter {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "OWNER" => Ok(FeedFilter::Owner),
            "ASSIGNED_BY" => Ok(FeedFilter::AssignedBy),
            "MENTIONS" => Ok(FeedFilter::Mentions),
            _ => Err(FeedError::Validation(format!("unknown feed filter '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// SuggestionType / SuggestionStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionType {
    #[serde(rename = "SuggestDescription")]
    Description,
    #[serde(rename = "SuggestTagLabel")]
    Tags,
}

impl fmt::Display for SuggestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionType::Description => "description",
            SuggestionType::Tags => "tags",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Severity1,
    Severity2,
    Severity3,
    Severity4,
    Severity5,
}

impl Severity {
    pub fn all() -> &'static [Severity] {
        &[
            Severity::Severity1,
            Severity::Severity2,
            Severity::Severity3,
            Severity::Severity4,
            Severity::Severity5,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Severity1 => "Severity1",
            Severity::Severity2 => "Severity2",
            Severity::Severity3 => "Severity3",
            Severity::Severity4 => "Severity4",
            Severity::Severity5 => "Severity5",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both "Severity3" and a bare "3".
        let digit = s.strip_prefix("Severity").unwrap_or(s);
        match digit {
            "1" => Ok(Severity::Severity1),
            "2" => Ok(Severity::Severity2),
            "3" => Ok(Severity::Severity3),
            "4" => Ok(Severity::Severity4),
            "5" => Ok(Severity::Severity5),
            _ => Err(FeedError::Validation(format!("unknown severity '{s}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolutionStatusType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionStatusType {
    New,
    Ack,
    Assigned,
    Resolved,
}

impl ResolutionStatusType {
    pub fn all() -> &'static [ResolutionStatusType] {
        &[
            ResolutionStatusType::New,
            ResolutionStatusType::Ack,
            ResolutionStatusType::Assigned,
            ResolutionStatusType::Resolved,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionStatusType::New => "New",
            ResolutionStatusType::Ack => "Ack",
            ResolutionStatusType::Assigned => "Assigned",
            ResolutionStatusType::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for ResolutionStatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionStatusType {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResolutionStatusType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| FeedError::Validation(format!("unknown resolution status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Operations the permission gate is asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    All,
    ViewAll,
    ViewBasic,
    EditAll,
    EditDescription,
    EditTags,
    EditTests,
    CreateTask,
}

impl Operation {
    pub fn all() -> &'static [Operation] {
        &[
            Operation::All,
            Operation::ViewAll,
            Operation::ViewBasic,
            Operation::EditAll,
            Operation::EditDescription,
            Operation::EditTags,
            Operation::EditTests,
            Operation::CreateTask,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::All => "All",
            Operation::ViewAll => "ViewAll",
            Operation::ViewBasic => "ViewBasic",
            Operation::EditAll => "EditAll",
            Operation::EditDescription => "EditDescription",
            Operation::EditTags => "EditTags",
            Operation::EditTests => "EditTests",
            Operation::CreateTask => "CreateTask",
        }
    }

    /// Whether a rule granting or denying `self` also covers `other`.
    ///
    /// `All` covers everything, `EditAll` covers every edit, `ViewAll` covers
    /// `ViewBasic`.
    pub fn covers(self, other: Operation) -> bool {
        match self {
            Operation::All => true,
            Operation::EditAll => matches!(
                other,
                Operation::EditAll
                    | Operation::EditDescription
                    | Operation::EditTags
                    | Operation::EditTests
            ),
            Operation::ViewAll => matches!(other, Operation::ViewAll | Operation::ViewBasic),
            op => op == other,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::all()
            .iter()
            .copied()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| FeedError::Validation(format!("unknown operation '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_maps_to_edit_operation() {
        assert_eq!(TaskType::RequestDescription.edit_operation(), Operation::EditDescription);
        assert_eq!(TaskType::UpdateTag.edit_operation(), Operation::EditTags);
        assert_eq!(TaskType::Generic.edit_operation(), Operation::EditAll);
    }

    #[test]
    fn task_type_parse_is_case_insensitive() {
        assert_eq!("requestTag".parse::<TaskType>().unwrap(), TaskType::RequestTag);
        assert!("bogus".parse::<TaskType>().is_err());
    }

    #[test]
    fn severity_accepts_bare_digit() {
        assert_eq!("3".parse::<Severity>().unwrap(), Severity::Severity3);
        assert_eq!("Severity5".parse::<Severity>().unwrap(), Severity::Severity5);
        assert!("Severity9".parse::<Severity>().is_err());
    }

    #[test]
    fn feed_filter_wire_names() {
        let json = serde_json::to_string(&FeedFilter::AssignedBy).unwrap();
        assert_eq!(json, "\"ASSIGNED_BY\"");
        assert_eq!("mentions".parse::<FeedFilter>().unwrap(), FeedFilter::Mentions);
    }

    #[test]
    fn suggestion_type_wire_names() {
        let json = serde_json::to_string(&SuggestionType::Tags).unwrap();
        assert_eq!(json, "\"SuggestTagLabel\"");
    }

    #[test]
    fn operation_coverage() {
        assert!(Operation::EditAll.covers(Operation::EditDescription));
        assert!(Operation::All.covers(Operation::ViewBasic));
        assert!(Operation::ViewAll.covers(Operation::ViewBasic));
        assert!(!Operation::EditDescription.covers(Operation::EditTags));
        assert!(!Operation::ViewAll.covers(Operation::EditTags));
    }
}
