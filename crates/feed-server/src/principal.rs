use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use feed_core::wire::{ErrorBody, PRINCIPAL_HEADER};

/// Login name of the caller, read from the principal header and stored in
/// request extensions for handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal(pub String);

impl Principal {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Rejects `/api/*` requests that do not name a principal.
pub async fn principal_middleware(mut req: Request<Body>, next: Next) -> Response {
    let name = req
        .headers()
        .get(PRINCIPAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    match name {
        Some(name) => {
            req.extensions_mut().insert(Principal(name));
            next.run(req).await
        }
        None if req.uri().path().starts_with("/api/") => {
            let body = ErrorBody {
                code: StatusCode::UNAUTHORIZED.as_u16(),
                message: format!("missing {PRINCIPAL_HEADER} header"),
            };
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
        None => next.run(req).await,
    }
}
