//! OS signal handling.
//!
//! SIGINT and SIGTERM both request a graceful shutdown; a repeated signal
//! forces exit. Tokio's signal handling is async-safe, so the wait runs as
//! an ordinary task.

use crate::lifecycle::shutdown::{Escalation, Shutdown, ShutdownReason};

/// Wait for SIGINT or SIGTERM and return the signal's name.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "ctrl-c")
}

/// Exit status used when a second signal cuts the graceful stop short.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a task that turns signals into shutdown requests.
///
/// The first signal starts a graceful stop. The task keeps listening, and a
/// second signal exits the process immediately with [`FORCED_EXIT_CODE`].
/// If the handlers cannot be installed the server keeps running without
/// graceful shutdown.
pub fn spawn_signal_listener(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let signal = match wait_for_signal().await {
                Ok(signal) => signal,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

            match shutdown.request(ShutdownReason::Signal(signal)) {
                Escalation::Graceful => {
                    tracing::info!(signal, "Shutdown signal received, stopping gracefully");
                }
                Escalation::Forced => {
                    tracing::warn!(signal, "Second shutdown signal received, exiting now");
                    std::process::exit(FORCED_EXIT_CODE);
                }
            }
        }
    })
}
