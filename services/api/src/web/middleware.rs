//! services/api/src/web/middleware.rs
//!
//! Resolves the current user of each request from the auth session cookie.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use dashboard_core::RequestContext;
use std::sync::Arc;
use tracing::debug;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Extracts the auth session ID from the `Cookie` header, if any.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|id| !id.is_empty())
}

/// Middleware that validates the auth session cookie and inserts a
/// `RequestContext` into the request extensions.
///
/// A missing, unknown or expired session yields an anonymous context; the
/// dashboard operations themselves refuse to run without a user.
pub async fn resolve_user(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let ctx = match session_cookie(req.headers()) {
        Some(auth_session_id) => match state.db.validate_auth_session(auth_session_id).await {
            Ok(user_id) => RequestContext::for_user(user_id),
            Err(e) => {
                debug!("Ignoring invalid auth session: {:?}", e);
                RequestContext::anonymous()
            }
        },
        None => RequestContext::anonymous(),
    };

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc-123; lang=en"),
        );
        assert_eq!(session_cookie(&headers), Some("abc-123"));
    }

    #[test]
    fn missing_or_empty_session_is_none() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_cookie(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("session=; sessionx=1"));
        assert_eq!(session_cookie(&headers), None);
    }
}
