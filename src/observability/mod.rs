//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers produce:
//!     → tracing events      → logging.rs  (stdout + OTLP logs)
//!     → tracing spans       → tracing.rs  (OTLP traces)
//!     → counters/histograms → metrics.rs  (Prometheus scrape)
//!
//! Consumers:
//!     → OTel collector (gRPC, batched, off the request path)
//!     → GET /metrics
//! ```
//!
//! # Design Decisions
//! - Providers are owned by [`Telemetry`] and passed explicitly; the only
//!   globals are the tracer provider and the `tracing` subscriber, which the
//!   SDK bridges require
//! - Shutdown order is the reverse of initialization: logs, then traces
//! - Shutdown failures are logged and reported, never fatal

pub mod logging;
pub mod metrics;
pub mod tracing;

use std::time::Duration;

use opentelemetry::KeyValue;
use opentelemetry_otlp::ExporterBuildError;
use opentelemetry_sdk::error::OTelSdkError;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

use crate::config::{ObservabilityConfig, TelemetryConfig};

pub use self::metrics::{AppMetrics, MetricsError, MetricsRegistry};

/// Errors raised while building, installing or shutting down telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to create trace exporter: {0}")]
    TraceExporter(#[source] ExporterBuildError),
    #[error("failed to create log exporter: {0}")]
    LogExporter(#[source] ExporterBuildError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
    #[error("failed to shut down {provider} provider: {source}")]
    Shutdown {
        provider: &'static str,
        #[source]
        source: OTelSdkError,
    },
    #[error("{provider} provider did not shut down within {grace:?}")]
    ShutdownTimeout {
        provider: &'static str,
        grace: Duration,
    },
}

/// Build the resource descriptor attached to every exported span and log.
pub fn build_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Handles to the trace and log providers.
pub struct Telemetry {
    service_name: String,
    tracer: Option<SdkTracerProvider>,
    logger: Option<SdkLoggerProvider>,
}

impl Telemetry {
    /// Build the trace pipeline, then the log pipeline, then install the
    /// tracer provider and propagator globally.
    ///
    /// Globals are only touched once both pipelines exist; on error the
    /// providers built so far are dropped. Returns a disabled handle when
    /// `config.enabled` is false.
    pub fn init(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        if !config.enabled {
            return Ok(Self::disabled(&config.service_name));
        }

        let resource = build_resource(&config.service_name);
        let tracer = tracing::init_tracer(config, resource.clone())?;
        let logger = logging::init_logger(config, resource)?;
        tracing::install_globals(&tracer);

        Ok(Self {
            service_name: config.service_name.clone(),
            tracer: Some(tracer),
            logger: Some(logger),
        })
    }

    /// A handle with no exporters.
    pub fn disabled(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            tracer: None,
            logger: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tracer.is_some() || self.logger.is_some()
    }

    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.tracer.as_ref()
    }

    pub fn logger_provider(&self) -> Option<&SdkLoggerProvider> {
        self.logger.as_ref()
    }

    /// Install the global subscriber bridging `tracing` into these providers.
    pub fn install_subscriber(&self, config: &ObservabilityConfig) -> Result<(), TelemetryError> {
        logging::init_subscriber(
            config,
            &self.service_name,
            self.tracer.as_ref(),
            self.logger.as_ref(),
        )
    }

    /// Flush and close the providers: logs first, then traces.
    ///
    /// Both providers are always attempted. Each gets `grace` to drain its
    /// queue; the first failure is returned after both have run.
    pub async fn shutdown(self, grace: Duration) -> Result<(), TelemetryError> {
        let mut first_error = None;

        if let Some(logger) = self.logger {
            let result = shutdown_provider("logger", grace, move || logger.shutdown()).await;
            record_failure(result, &mut first_error);
        }

        if let Some(tracer) = self.tracer {
            let result = shutdown_provider("tracer", grace, move || tracer.shutdown()).await;
            record_failure(result, &mut first_error);
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record_failure(result: Result<(), TelemetryError>, first_error: &mut Option<TelemetryError>) {
    if let Err(err) = result {
        ::tracing::warn!(error = %err, "Telemetry shutdown failed");
        first_error.get_or_insert(err);
    }
}

/// Provider shutdown blocks on its background worker, so it runs on the
/// blocking pool and is abandoned after `grace`.
async fn shutdown_provider<F>(
    provider: &'static str,
    grace: Duration,
    shutdown: F,
) -> Result<(), TelemetryError>
where
    F: FnOnce() -> Result<(), OTelSdkError> + Send + 'static,
{
    match tokio::time::timeout(grace, tokio::task::spawn_blocking(shutdown)).await {
        Ok(Ok(Ok(()))) => {
            ::tracing::debug!(provider, "Telemetry provider shut down");
            Ok(())
        }
        Ok(Ok(Err(source))) => Err(TelemetryError::Shutdown { provider, source }),
        Ok(Err(join_error)) => Err(TelemetryError::Shutdown {
            provider,
            source: OTelSdkError::InternalFailure(join_error.to_string()),
        }),
        Err(_) => Err(TelemetryError::ShutdownTimeout { provider, grace }),
    }
}
