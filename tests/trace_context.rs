//! Trace context on `/hello`: the trace-id response header, parenting on an
//! incoming `traceparent`, and trace ids on exported log records.
//!
//! Each test installs a thread-local subscriber backed by in-memory
//! exporters and drives the router in-process on the test's runtime thread.

use axum::body::Body;
use axum::http::{HeaderName, Request, Response, StatusCode};
use hello_observability::http::HELLO_BODY;
use hello_observability::lifecycle::startup::build_state;
use hello_observability::HttpServer;
use opentelemetry::logs::AnyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider};
use tower::ServiceExt;
use tracing_subscriber::layer::SubscriberExt;

const TRACEPARENT: &str = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
const PARENT_TRACE_ID: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
const PARENT_SPAN_ID: &str = "00f067aa0ba902b7";

/// Span and log pipelines exporting synchronously into memory.
struct Pipelines {
    spans: InMemorySpanExporter,
    logs: InMemoryLogExporter,
    tracer: SdkTracerProvider,
    logger: SdkLoggerProvider,
}

impl Pipelines {
    fn new() -> Self {
        let spans = InMemorySpanExporter::default();
        let logs = InMemoryLogExporter::default();
        let tracer = SdkTracerProvider::builder()
            .with_simple_exporter(spans.clone())
            .build();
        let logger = SdkLoggerProvider::builder()
            .with_simple_exporter(logs.clone())
            .build();
        Self {
            spans,
            logs,
            tracer,
            logger,
        }
    }

    fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry()
            .with(
                tracing_opentelemetry::layer()
                    .with_tracer(self.tracer.tracer("trace-context-test")),
            )
            .with(OpenTelemetryTracingBridge::new(&self.logger))
    }
}

async fn get_hello(traceparent: Option<&str>) -> (Response<Body>, String) {
    let state = build_state().unwrap();
    let router = HttpServer::new(state, Some(HeaderName::from_static("x-trace-id"))).router();

    let mut request = Request::builder().uri("/hello");
    if let Some(traceparent) = traceparent {
        request = request.header("traceparent", traceparent);
    }

    let response = router
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, 1024).await.unwrap();
    (
        Response::from_parts(parts, Body::empty()),
        String::from_utf8(body.to_vec()).unwrap(),
    )
}

fn trace_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_traceparent_sets_trace_id_header_and_parent() {
    let pipelines = Pipelines::new();
    let _guard = tracing::subscriber::set_default(pipelines.subscriber());

    let (response, body) = get_hello(Some(TRACEPARENT)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body, HELLO_BODY);
    assert_eq!(trace_header(&response).as_deref(), Some(PARENT_TRACE_ID));

    let spans = pipelines.spans.get_finished_spans().unwrap();
    let request_span = spans
        .iter()
        .find(|span| span.name == "/hello")
        .expect("request span was not exported");
    assert_eq!(request_span.span_context.trace_id().to_string(), PARENT_TRACE_ID);
    assert_eq!(request_span.parent_span_id.to_string(), PARENT_SPAN_ID);
}

#[tokio::test]
async fn test_trace_id_header_without_traceparent() {
    let pipelines = Pipelines::new();
    let _guard = tracing::subscriber::set_default(pipelines.subscriber());

    let (response, _) = get_hello(None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let trace_id = trace_header(&response).expect("x-trace-id missing");
    assert_eq!(trace_id.len(), 32);
    assert!(trace_id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(trace_id, "0".repeat(32));

    let spans = pipelines.spans.get_finished_spans().unwrap();
    let request_span = spans.iter().find(|span| span.name == "/hello").unwrap();
    assert_eq!(request_span.span_context.trace_id().to_string(), trace_id);
}

#[tokio::test]
async fn test_hello_log_record_carries_request_trace() {
    let pipelines = Pipelines::new();
    let _guard = tracing::subscriber::set_default(pipelines.subscriber());

    let (response, _) = get_hello(None).await;
    let trace_id = trace_header(&response).expect("x-trace-id missing");

    let spans = pipelines.spans.get_finished_spans().unwrap();
    let request_span = spans.iter().find(|span| span.name == "/hello").unwrap();

    let logs = pipelines.logs.get_emitted_logs().unwrap();
    let hello_log = logs
        .iter()
        .find(|log| {
            matches!(
                log.record.body(),
                Some(AnyValue::String(message)) if message.as_str() == "Handling /hello request"
            )
        })
        .expect("handler log record was not exported");

    let context = hello_log
        .record
        .trace_context()
        .expect("log record has no trace context");
    assert_eq!(context.trace_id.to_string(), trace_id);
    assert_eq!(context.span_id, request_span.span_context.span_id());
}
