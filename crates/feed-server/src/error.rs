use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use feed_core::wire::ErrorBody;
use feed_core::FeedError;

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// 400 with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(FeedError::InvalidQuery(msg.into()).into())
    }
}

/// HTTP status for a domain error. Denials are 403 so clients can tell them
/// apart from rule violations.
pub fn status_for(err: &FeedError) -> StatusCode {
    match err {
        FeedError::Validation(_)
        | FeedError::Policy(_)
        | FeedError::InvalidEntityLink(_)
        | FeedError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        FeedError::Permission(_) => StatusCode::FORBIDDEN,
        FeedError::TaskNotFound(_)
        | FeedError::ThreadNotFound(_)
        | FeedError::PostNotFound(_)
        | FeedError::EntityNotFound(_)
        | FeedError::IncidentNotFound(_)
        | FeedError::NotFound(_) => StatusCode::NOT_FOUND,
        FeedError::InvalidTransition { .. } => StatusCode::CONFLICT,
        FeedError::Network(_) => StatusCode::BAD_GATEWAY,
        FeedError::Internal(_) | FeedError::Io(_) | FeedError::Yaml(_) | FeedError::Json(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self
            .0
            .downcast_ref::<FeedError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let body = ErrorBody {
            code: status.as_u16(),
            message: self.0.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
