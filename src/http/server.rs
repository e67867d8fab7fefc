//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with both routes
//! - Wrap `/hello` in a request span (tower-http `TraceLayer`)
//! - Assign and propagate `x-request-id`
//! - Serve until a shutdown request, then drain in-flight requests for at
//!   most the grace period

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderName,
    middleware,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnFailure, TraceLayer},
};
use tracing::Level;

use crate::http::{handlers, response};
use crate::lifecycle::shutdown::{requested, ShutdownReason};
use crate::observability::tracing::RouteSpan;
use crate::observability::{AppMetrics, MetricsRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MetricsRegistry>,
    pub metrics: AppMetrics,
}

impl AppState {
    pub fn new(registry: Arc<MetricsRegistry>, metrics: AppMetrics) -> Self {
        Self { registry, metrics }
    }
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// `trace_header` names the response header carrying the trace id; `None`
    /// disables it.
    pub fn new(state: AppState, trace_header: Option<HeaderName>) -> Self {
        Self {
            router: Self::build_router(state, trace_header),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, trace_header: Option<HeaderName>) -> Router {
        let hello = get(handlers::hello)
            .layer::<_, std::convert::Infallible>(middleware::from_fn_with_state(
                trace_header,
                response::trace_id_header,
            ))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(RouteSpan::new("/hello"))
                    .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
            );

        Router::new()
            .route("/hello", hello)
            .route("/metrics", get(handlers::metrics))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until `shutdown` fires, then drain.
    ///
    /// Connections still open `drain_grace` after the request are abandoned,
    /// so a stalled client cannot hold the process open.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<ShutdownReason>,
        drain_grace: Duration,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let (draining_tx, draining_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let reason = requested(&mut shutdown).await;
                tracing::info!(%reason, "Shutdown requested, draining connections");
                let _ = draining_tx.send(());
            })
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = async {
                let _ = draining_rx.await;
                tokio::time::sleep(drain_grace).await;
            } => {
                tracing::warn!(
                    grace = ?drain_grace,
                    "Drain grace period elapsed, abandoning open connections"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
