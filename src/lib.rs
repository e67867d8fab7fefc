//! Hello Observability
//!
//! A minimal HTTP service instrumented with Prometheus metrics, OTLP traces
//! and OTLP logs.
//!
//! # Architecture Overview
//!
//! ```text
//!     GET /hello ──▶ request id ──▶ TraceLayer span ──▶ hello handler
//!                                                         │  │  │
//!                                     histogram ◀─────────┘  │  └──▶ counter
//!                                                            ▼
//!                                                    tracing event
//!                                                            │
//!                         ┌──────────────────────────────────┴───────────┐
//!                         ▼                                              ▼
//!                   stdout (fmt)                           batch processors ──▶ otel-collector:4317
//!
//!     GET /metrics ──▶ Prometheus text exposition
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
