//! Startup orchestration.
//!
//! # Order
//! tracer → logger → subscriber → metrics → bind → serve → telemetry shutdown
//!
//! # Design Decisions
//! - Fail fast: any error before serving aborts startup
//! - Listeners start last, so a bad exporter never gets as far as binding
//! - Once telemetry exists it is shut down on every exit path

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderName;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AppConfig;
use crate::http::{AppState, HttpServer};
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};
use crate::observability::{AppMetrics, MetricsError, MetricsRegistry, Telemetry, TelemetryError};

/// Lifecycle phase of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Serving,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initializing => write!(f, "initializing"),
            Phase::Serving => write!(f, "serving"),
            Phase::Terminated => write!(f, "terminated"),
        }
    }
}

/// Errors that stop the service.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("metrics: {0}")]
    Metrics(#[from] MetricsError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

impl StartupError {
    /// Whether the subscriber was installed when this error occurred, in
    /// which case [`run`] has already logged it.
    pub fn is_logged(&self) -> bool {
        !matches!(
            self,
            StartupError::Telemetry(
                TelemetryError::TraceExporter(_)
                    | TelemetryError::LogExporter(_)
                    | TelemetryError::Subscriber(_)
            )
        )
    }
}

/// Build the metrics registry and the handler state.
pub fn build_state() -> Result<AppState, MetricsError> {
    let registry = Arc::new(MetricsRegistry::new()?);
    let metrics = AppMetrics::register(&registry)?;
    Ok(AppState::new(registry, metrics))
}

/// Run the service until `shutdown` fires.
///
/// Installs the global `tracing` subscriber, so it can run once per process.
/// Errors raised after that are logged here, before the log exporter closes;
/// [`StartupError::is_logged`] tells the caller which ones.
pub async fn run(config: AppConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let server_shutdown = shutdown.subscribe();

    let telemetry = Telemetry::init(&config.telemetry)?;
    let grace = Duration::from_secs(config.telemetry.shutdown_grace_secs);

    let result = serve(&config, &telemetry, server_shutdown, grace).await;

    // Last records that can still reach the log exporter.
    match &result {
        Ok(()) => tracing::info!(phase = %Phase::Terminated, "Service stopped, flushing telemetry"),
        Err(e) if e.is_logged() => tracing::error!(
            phase = %Phase::Terminated,
            error = %e,
            "Service terminated, flushing telemetry"
        ),
        Err(_) => {}
    }
    // Shutdown failures are already logged per provider; they do not change the exit status.
    let _ = telemetry.shutdown(grace).await;

    result
}

async fn serve(
    config: &AppConfig,
    telemetry: &Telemetry,
    shutdown: broadcast::Receiver<ShutdownReason>,
    drain_grace: Duration,
) -> Result<(), StartupError> {
    telemetry.install_subscriber(&config.observability)?;

    tracing::info!(
        phase = %Phase::Initializing,
        version = env!("CARGO_PKG_VERSION"),
        service_name = %config.telemetry.service_name,
        endpoint = %config.telemetry.endpoint,
        exporting = telemetry.is_enabled(),
        "Telemetry initialized"
    );

    let state = build_state()?;

    // Validation already rejected malformed names.
    let trace_header = config
        .telemetry
        .trace_response_header
        .as_deref()
        .filter(|_| telemetry.is_enabled())
        .and_then(|name| HeaderName::from_bytes(name.as_bytes()).ok());

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        phase = %Phase::Serving,
        address = %config.listener.bind_address,
        "Listening for connections"
    );

    HttpServer::new(state, trace_header)
        .run(listener, shutdown, drain_grace)
        .await
        .map_err(StartupError::Serve)
}
