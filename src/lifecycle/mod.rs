//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Telemetry → subscriber → metrics → bind → serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::request (a second signal exits at once)
//!
//! Shutdown (shutdown.rs):
//!     Request → stop accepting → drain (bounded) → logger shutdown → tracer shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: telemetry first, listeners last
//! - Ordered shutdown: reverse of initialization
//! - The drain and each provider shutdown have a grace period; the process
//!   exits regardless

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Escalation, Shutdown, ShutdownReason};
pub use startup::{run, Phase, StartupError};
