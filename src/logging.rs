use std::time::Instant;

use axum::{
    extract::{Query, Request},
    http::Uri,
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::http::handlers::MessagesQuery;

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Emits one summary line per request. For `/sse` the line is written when the
/// stream is established, not when it closes.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let session_id = session_id_from_uri(request.uri()).unwrap_or_default();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    info!(
        method = %method,
        path = %path,
        session_id = %session_id,
        status = status.as_u16(),
        duration_ms = elapsed_ms,
        "request summary"
    );

    if status.as_u16() == 401 {
        warn!(method = %method, path = %path, "authentication failure");
    }

    response
}

/// Decodes `sessionId` the same way the `/messages` handler does.
fn session_id_from_uri(uri: &Uri) -> Option<String> {
    Query::<MessagesQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.session_id)
}

#[cfg(test)]
mod tests {
    use axum::http::Uri;

    use super::session_id_from_uri;

    fn session_id(uri: &'static str) -> Option<String> {
        session_id_from_uri(&Uri::from_static(uri))
    }

    #[test]
    fn extracts_session_id_from_query() {
        assert_eq!(
            session_id("/messages?a=1&sessionId=abc-123").as_deref(),
            Some("abc-123")
        );
        assert_eq!(session_id("/messages?a=1"), None);
        assert_eq!(session_id("/health"), None);
    }

    #[test]
    fn percent_encoded_session_id_is_decoded() {
        assert_eq!(
            session_id("/messages?sessionId=abc%2D123").as_deref(),
            Some("abc-123")
        );
        assert_eq!(
            session_id("/messages?sessionId=a%20b").as_deref(),
            Some("a b")
        );
    }
}
