//! Request handlers.

use axum::{
    extract::State,
    http::{header, HeaderMap, Method},
    response::IntoResponse,
};

use crate::http::server::AppState;

/// Body returned by `/hello`.
pub const HELLO_BODY: &str = "Hello, Observability!";

/// Content type of the Prometheus text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Instrumented greeting handler.
///
/// The duration sample is observed when `_timer` drops, on every exit path.
pub async fn hello(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> impl IntoResponse {
    let _timer = state.metrics.start_timer();

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    tracing::info!(
        method = %method,
        user_agent = %user_agent,
        "Handling /hello request"
    );

    state.metrics.record_request();

    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], HELLO_BODY)
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        state.registry.render(),
    )
}
