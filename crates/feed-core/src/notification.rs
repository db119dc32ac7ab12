use crate::error::FeedError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const NETWORK_MESSAGE: &str = "Unable to reach the catalog server, please try again";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        })
    }
}

/// User-visible message for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }

    /// `None` for validation errors: those disable the action instead.
    pub fn from_error(err: &FeedError) -> Option<Self> {
        let (level, message) = match err {
            FeedError::Validation(_) => return None,
            FeedError::Policy(rule) => (Level::Warning, rule.clone()),
            FeedError::Permission(denial) => (Level::Error, denial.to_string()),
            FeedError::Network(_) => (Level::Error, NETWORK_MESSAGE.to_string()),
            other => (Level::Error, other.to_string()),
        };
        Some(Self { level, message })
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
