//! Distributed tracing support.
//!
//! # Responsibilities
//! - Build the OTLP/gRPC span exporter and batching span processor
//! - Install the tracer provider and the W3C trace-context propagator, once
//!   every pipeline has been built
//! - Create request spans, parented on any incoming `traceparent`
//! - Expose the trace id of the current request span
//!
//! Spans are held in memory until `max_export_batch_size` of them
//! accumulate or `scheduled_delay_secs` elapses, whichever comes first.

use std::time::Duration;

use axum::http::{HeaderMap, Request};
use opentelemetry::propagation::TextMapPropagator;
use opentelemetry::trace::TraceContextExt;
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{BatchConfigBuilder, BatchSpanProcessor, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use tower_http::trace::MakeSpan;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::TelemetryConfig;
use crate::observability::TelemetryError;

/// Build the trace pipeline.
///
/// Nothing is installed globally; see [`install_globals`].
pub fn init_tracer(
    config: &TelemetryConfig,
    resource: Resource,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.clone())
        .with_timeout(Duration::from_secs(config.export_timeout_secs))
        .build()
        .map_err(TelemetryError::TraceExporter)?;

    let batch_config = BatchConfigBuilder::default()
        .with_max_export_batch_size(config.max_export_batch_size)
        .with_scheduled_delay(Duration::from_secs(config.scheduled_delay_secs))
        .with_max_queue_size(config.max_queue_size)
        .build();

    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(batch_config)
        .build();

    let provider = SdkTracerProvider::builder()
        .with_span_processor(processor)
        .with_resource(resource)
        .build();

    tracing::debug!(
        endpoint = %config.endpoint,
        max_export_batch_size = config.max_export_batch_size,
        scheduled_delay_secs = config.scheduled_delay_secs,
        "Trace pipeline initialized"
    );

    Ok(provider)
}

/// Make `provider` the global tracer provider and W3C trace context the
/// global propagator.
pub fn install_globals(provider: &SdkTracerProvider) {
    global::set_text_map_propagator(TraceContextPropagator::new());
    global::set_tracer_provider(provider.clone());
}

/// Extract the caller's trace context from W3C `traceparent`/`tracestate` headers.
pub fn extract_context(headers: &HeaderMap) -> Context {
    TraceContextPropagator::new().extract(&HeaderExtractor(headers))
}

/// Names request spans after the route they serve.
#[derive(Debug, Clone)]
pub struct RouteSpan {
    route: &'static str,
}

impl RouteSpan {
    pub fn new(route: &'static str) -> Self {
        Self { route }
    }
}

impl<B> MakeSpan<B> for RouteSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");

        let span = tracing::info_span!(
            "request",
            otel.name = self.route,
            otel.kind = "server",
            http.request.method = %request.method(),
            http.route = self.route,
            url.path = %request.uri().path(),
            request_id = %request_id,
        );
        span.set_parent(extract_context(request.headers()));
        span
    }
}

/// Hex trace id of the current span, if it carries a valid OTel span context.
///
/// Unsampled traces still report their id.
pub fn current_trace_id() -> Option<String> {
    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use opentelemetry::trace::TracerProvider as _;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn extracts_w3c_parent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "traceparent",
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );

        let context = extract_context(&headers);
        let span = context.span();
        let span_context = span.span_context();
        assert!(span_context.is_remote());
        assert_eq!(
            span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
    }

    #[test]
    fn missing_traceparent_yields_empty_context() {
        let context = extract_context(&HeaderMap::new());
        assert!(!context.span().span_context().is_valid());
    }

    #[test]
    fn no_trace_id_without_otel_layer() {
        assert_eq!(current_trace_id(), None);
    }

    #[tokio::test]
    async fn invalid_endpoint_fails_exporter_construction() {
        let config = TelemetryConfig {
            endpoint: "http://bad endpoint:4317".to_string(),
            ..TelemetryConfig::default()
        };
        let result = init_tracer(&config, Resource::builder().build());
        assert!(matches!(result, Err(TelemetryError::TraceExporter(_))));
    }

    #[test]
    fn unsampled_parent_still_reports_trace_id() {
        let provider = SdkTracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));

        let request = Request::builder()
            .uri("/hello")
            .header(
                "traceparent",
                "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00",
            )
            .body(())
            .unwrap();

        tracing::subscriber::with_default(subscriber, || {
            let span = RouteSpan::new("/hello").make_span(&request);
            let _entered = span.enter();
            assert!(!span.context().span().span_context().is_sampled());
            assert_eq!(
                current_trace_id().as_deref(),
                Some("4bf92f3577b34da6a3ce929d0e0e4736")
            );
        });
    }

    #[tokio::test]
    async fn init_tracer_installs_nothing_globally() {
        let config = TelemetryConfig {
            endpoint: "http://127.0.0.1:4317".to_string(),
            ..TelemetryConfig::default()
        };
        let provider = init_tracer(&config, Resource::builder().build()).unwrap();

        let fields = global::get_text_map_propagator(|propagator| propagator.fields().count());
        assert_eq!(fields, 0);

        provider.shutdown().unwrap();
    }
}
