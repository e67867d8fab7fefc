//! Configuration schema definitions.
//!
//! All types deserialize from a TOML file. Every section carries
//! `#[serde(default)]`, so an empty file yields the stock
//! deployment: port 8080, service `go-app`, collector at `otel-collector:4317`.

use serde::Deserialize;

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// OTLP export settings for traces and logs.
    pub telemetry: TelemetryConfig,

    /// Local logging settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Telemetry export configuration shared by the trace and log pipelines.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Build OTLP exporters. When false, logs only go to stdout.
    pub enabled: bool,

    /// `service.name` resource attribute.
    pub service_name: String,

    /// Collector gRPC endpoint. An `http://` scheme means plaintext transport.
    pub endpoint: String,

    /// Timeout for a single export call in seconds.
    pub export_timeout_secs: u64,

    /// Maximum spans per export batch.
    pub max_export_batch_size: usize,

    /// Maximum time a span waits in the batch before export, in seconds.
    pub scheduled_delay_secs: u64,

    /// Bound on buffered spans; spans beyond it are dropped.
    pub max_queue_size: usize,

    /// Upper bound on the flush performed by each provider at shutdown.
    pub shutdown_grace_secs: u64,

    /// Response header carrying the request's trace id. `None` disables it.
    pub trace_response_header: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            service_name: "go-app".to_string(),
            endpoint: "http://otel-collector:4317".to_string(),
            export_timeout_secs: 10,
            max_export_batch_size: 512,
            scheduled_delay_secs: 5,
            max_queue_size: 2048,
            shutdown_grace_secs: 5,
            trace_response_header: Some("X-Trace-Id".to_string()),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
