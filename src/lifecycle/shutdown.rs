//! Shutdown requests.
//!
//! The first request starts a graceful stop and is broadcast to the server
//! together with its reason. Any later request means the operator gave up
//! waiting; the caller decides what to do with it (the signal listener
//! exits the process).

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

/// Why the service is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An OS signal, by name.
    Signal(&'static str),
    /// Requested in-process (tests, embedding code).
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "{}", name),
            ShutdownReason::Requested => write!(f, "requested"),
        }
    }
}

/// Outcome of a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// First request: the server drains and telemetry is flushed.
    Graceful,
    /// A stop was already in progress.
    Forced,
}

/// Shared handle used to request a stop and to wait for one.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<ShutdownReason>,
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Receiver that yields the reason of the first request.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.tx.subscribe()
    }

    /// Request a stop. Only the first request is broadcast.
    pub fn request(&self, reason: ShutdownReason) -> Escalation {
        if self.requested.swap(true, Ordering::SeqCst) {
            return Escalation::Forced;
        }
        let _ = self.tx.send(reason);
        Escalation::Graceful
    }

    /// Shorthand for an in-process request.
    pub fn trigger(&self) {
        self.request(ShutdownReason::Requested);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the first request on `rx`.
///
/// A closed channel means every `Shutdown` handle is gone, which is treated
/// as a request.
pub async fn requested(rx: &mut broadcast::Receiver<ShutdownReason>) -> ShutdownReason {
    loop {
        match rx.recv().await {
            Ok(reason) => return reason,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => return ShutdownReason::Requested,
        }
    }
}
