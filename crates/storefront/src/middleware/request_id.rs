//! Request ID middleware for request tracing and correlation.
//!
//! Every request carries an `x-request-id`. A well-formed id from the
//! reverse proxy is kept; anything else is replaced with a fresh UUID v4 so
//! log lines and Sentry events can always be joined on it.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Upstream ids longer than this are discarded.
const MAX_UPSTREAM_LEN: usize = 128;

/// Keep a proxy-supplied id only if it is short printable ASCII.
fn upstream_id(request: &Request) -> Option<String> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let acceptable = !raw.is_empty()
        && raw.len() <= MAX_UPSTREAM_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    acceptable.then(|| raw.to_owned())
}

/// Tag the request with an id and echo it back on the response.
///
/// The id is recorded on the `http_request` span, set as a Sentry tag, and
/// returned in the `x-request-id` response header.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

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
