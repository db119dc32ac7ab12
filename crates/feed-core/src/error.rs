use crate::permission::Denial;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Malformed input. Interactive callers disable the action instead of
    /// surfacing this.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A business rule rejected the request.
    #[error("{0}")]
    Policy(String),

    #[error("{0}")]
    Permission(Denial),

    #[error("network error: {0}")]
    Network(String),

    /// The backend failed with an unstructured message.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("task not found: {0}")]
    TaskNotFound(u64),

    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    #[error("post not found: {0}")]
    PostNotFound(String),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("incident not found: {0}")]
    IncidentNotFound(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid entity link '{0}'")]
    InvalidEntityLink(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Only transport failures are worth retrying. Permission denials are
    /// terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Network(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FeedError::TaskNotFound(_)
                | FeedError::ThreadNotFound(_)
                | FeedError::PostNotFound(_)
                | FeedError::EntityNotFound(_)
                | FeedError::IncidentNotFound(_)
                | FeedError::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
