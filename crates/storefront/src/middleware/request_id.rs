//! Request ID middleware for request tracing and correlation.
//!
//! Every request gets an ID: the upstream proxy's `x-request-id` when it is
//! well-formed, otherwise a fresh UUID v4. The ID is recorded in the current
//! span and the Sentry scope, and echoed back in the response headers.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Accept an incoming ID only if it is short, printable ASCII.
fn sanitize(incoming: Option<&str>) -> Option<String> {
    let id = incoming?.trim();
    let ok = !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    ok.then(|| id.to_string())
}

/// Middleware that ensures every request has a request ID.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = sanitize(
        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|h| h.to_str().ok()),
    )
    .unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_accepts_proxy_ids() {
        assert_eq!(
            sanitize(Some("8f14e45f-ceea-467f-a0e6-5f5e0d1b6e3c")).as_deref(),
            Some("8f14e45f-ceea-467f-a0e6-5f5e0d1b6e3c")
        );
        assert_eq!(sanitize(Some(" req_42 ")).as_deref(), Some("req_42"));
    }

    #[test]
    fn test_sanitize_rejects_junk() {
        assert!(sanitize(None).is_none());
        assert!(sanitize(Some("")).is_none());
        assert!(sanitize(Some("<script>")).is_none());
        assert!(sanitize(Some(&"a".repeat(200))).is_none());
    }
}
