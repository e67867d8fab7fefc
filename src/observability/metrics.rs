//! Metrics collection and exposition.
//!
//! # Metrics
//! - `goapp_http_requests_total` (counter): requests handled by `/hello`
//! - `goapp_response_duration_seconds` (histogram): `/hello` latency
//!
//! # Design Decisions
//! - The registry owns its Prometheus recorder instead of installing a global
//!   one, so every server (and every test) gets an isolated instance
//! - A metric name can be registered once; a second registration is an error
//! - Instrument updates are atomic and lock-free

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use metrics::{Counter, Histogram, Key, Level, Metadata, Recorder};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

/// Total requests served by the hello handler.
pub const REQUESTS_TOTAL: &str = "goapp_http_requests_total";

/// Latency of the hello handler in seconds.
pub const RESPONSE_DURATION_SECONDS: &str = "goapp_response_duration_seconds";

/// Default latency buckets in seconds, the usual Prometheus client defaults.
pub const DEFAULT_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Errors raised while building or populating the registry.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("metric '{0}' is already registered")]
    AlreadyRegistered(String),
    #[error("failed to build prometheus recorder: {0}")]
    Build(#[from] BuildError),
}

/// A registry of named instruments rendered in Prometheus text format.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    names: Mutex<HashSet<String>>,
}

impl MetricsRegistry {
    /// Create a registry whose histograms use [`DEFAULT_BUCKETS`].
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Create a registry with custom histogram buckets.
    pub fn with_buckets(buckets: &[f64]) -> Result<Self, MetricsError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), buckets)?
            .build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            recorder,
            handle,
            names: Mutex::new(HashSet::new()),
        })
    }

    /// Register a monotonic counter.
    pub fn register_counter(&self, name: &str, help: &str) -> Result<Counter, MetricsError> {
        self.claim(name)?;
        self.recorder
            .describe_counter(name.to_string().into(), None, help.to_string().into());
        Ok(self.recorder.register_counter(&Key::from_name(name.to_string()), &metadata()))
    }

    /// Register a histogram. Names ending in `_seconds` get the registry buckets.
    pub fn register_histogram(&self, name: &str, help: &str) -> Result<Histogram, MetricsError> {
        self.claim(name)?;
        self.recorder
            .describe_histogram(name.to_string().into(), None, help.to_string().into());
        Ok(self.recorder.register_histogram(&Key::from_name(name.to_string()), &metadata()))
    }

    /// Render all instruments in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    fn claim(&self, name: &str) -> Result<(), MetricsError> {
        let mut names = self.names.lock().expect("metrics registry mutex poisoned");
        if !names.insert(name.to_string()) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }
        Ok(())
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), Level::INFO, Some(module_path!()))
}

/// The instruments recorded by the HTTP handlers.
#[derive(Clone)]
pub struct AppMetrics {
    requests_total: Counter,
    response_duration: Histogram,
}

impl AppMetrics {
    /// Register the application instruments. Fails if either name is taken.
    pub fn register(registry: &MetricsRegistry) -> Result<Self, MetricsError> {
        let requests_total = registry.register_counter(
            REQUESTS_TOTAL,
            "Total number of HTTP requests handled by the app",
        )?;
        let response_duration = registry.register_histogram(
            RESPONSE_DURATION_SECONDS,
            "Histogram of response durations for /hello",
        )?;

        Ok(Self {
            requests_total,
            response_duration,
        })
    }

    /// Count one handled request.
    pub fn record_request(&self) {
        self.requests_total.increment(1);
    }

    /// Start timing a response. The sample is observed when the timer drops.
    pub fn start_timer(&self) -> ResponseTimer {
        ResponseTimer {
            histogram: self.response_duration.clone(),
            start: Instant::now(),
        }
    }
}

/// Observes the elapsed time into the duration histogram on drop.
pub struct ResponseTimer {
    histogram: Histogram,
    start: Instant,
}

impl Drop for ResponseTimer {
    fn drop(&mut self) {
        self.histogram.record(self.start.elapsed().as_secs_f64());
    }
}
