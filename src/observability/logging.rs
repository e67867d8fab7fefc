//! Structured logging.
//!
//! # Responsibilities
//! - Build the OTLP/gRPC log exporter and batching log processor
//! - Install the `tracing` subscriber: stdout formatter, span bridge, log bridge
//! - Configure log level from `RUST_LOG` or the config file
//!
//! # Design Decisions
//! - `tracing` macros are the only logging API; OTLP export is a layer
//! - Events inside a request span carry that span's trace context
//! - The exporter stack's own crates are muted on the OTLP bridge so
//!   exporting a record never produces another record

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{LogExporter, WithExportConfig};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::{ObservabilityConfig, TelemetryConfig};
use crate::observability::TelemetryError;

const BRIDGE_FILTER: &str = "info,hyper=off,h2=off,tonic=off,tower=off,reqwest=off,opentelemetry=off";

/// Build the log pipeline.
///
/// The provider only receives records once [`init_subscriber`] bridges it.
pub fn init_logger(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkLoggerProvider, TelemetryError> {
    let exporter = LogExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.clone())
        .with_timeout(Duration::from_secs(config.export_timeout_secs))
        .build()
        .map_err(TelemetryError::LogExporter)?;

    let provider = SdkLoggerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    Ok(provider)
}

/// Install the process-wide `tracing` subscriber.
///
/// Spans are exported through `tracer` and events through `logger` when
/// they are present; stdout formatting is always on.
pub fn init_subscriber(
    config: &ObservabilityConfig,
    service_name: &str,
    tracer: Option<&SdkTracerProvider>,
    logger: Option<&SdkLoggerProvider>,
) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let span_layer = tracer.map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(service_name.to_string()))
    });
    let log_layer = logger.map(|provider| {
        OpenTelemetryTracingBridge::new(provider).with_filter(EnvFilter::new(BRIDGE_FILTER))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(span_layer)
        .with(log_layer)
        .try_init()?;

    Ok(())
}

fn default_directives(level: &str) -> String {
    format!("hello_observability={level},tower_http={level},warn")
}
