//! Response decoration.
//!
//! Adds the trace id of the request span to responses so a caller can look
//! the request up in the tracing backend.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::observability::tracing::current_trace_id;

/// Header name used unless the config overrides it.
pub const X_TRACE_ID: &str = "x-trace-id";

/// Middleware inserting the current trace id under the configured header.
///
/// Must run inside the request span. Without an active OTel trace, or with
/// the header disabled, the response passes through untouched.
pub async fn trace_id_header(
    State(header): State<Option<HeaderName>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    if let Some(header) = header {
        if let Some(value) = current_trace_id().and_then(|id| HeaderValue::from_str(&id).ok()) {
            response.headers_mut().insert(header, value);
        }
    }

    response
}
