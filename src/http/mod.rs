//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, routing)
//!     → /hello:   TraceLayer span → response.rs (trace id header) → handlers::hello
//!     → /metrics: handlers::metrics (no span)
//!     → Send to client
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use handlers::HELLO_BODY;
pub use server::{AppState, HttpServer};
