//! Correlation id propagation through request-scoped context.
//!
//! A UUIDv4 correlation id is read from (or generated for) every inbound
//! request, stashed in a task-local so any code running within that
//! request's async task tree can retrieve it without threading it through
//! every function signature, and echoed back via the configured response
//! header (`correlation.header`, default `X-Correlation-ID`).

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

tokio::task_local! {
    static CORRELATION_ID: String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId;

/// Returns the correlation id for the currently-executing request, if any.
pub fn current() -> Option<String> {
    CORRELATION_ID.try_with(|id| id.clone()).ok()
}

/// Axum middleware: extracts or generates the correlation id, scopes the
/// rest of the request's async task tree with it via a task-local, and
/// sets it on the response.
pub async fn correlation_layer(header_name: HeaderName, request: Request<Body>, next: Next) -> Response {
    let incoming = request
        .headers()
        .get(&header_name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let id_for_response = incoming.clone();
    let mut response = CORRELATION_ID.scope(incoming, next.run(request)).await;

    if let Ok(value) = HeaderValue::from_str(&id_for_response) {
        response.headers_mut().insert(header_name, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scoped_id_is_visible_within_task() {
        let observed = CORRELATION_ID
            .scope("abc-123".to_string(), async { current() })
            .await;
        assert_eq!(observed.as_deref(), Some("abc-123"));
    }

    #[tokio::test]
    async fn outside_scope_there_is_no_id() {
        assert_eq!(current(), None);
    }
}
