//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderName;
use hello_observability::http::{AppState, HttpServer};
use hello_observability::lifecycle::startup::build_state;
use hello_observability::Shutdown;
use tokio::net::TcpListener;

/// How long a stopped test server waits for open connections.
pub const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server with a fresh metrics registry and no exporters.
pub async fn start_server(trace_header: Option<HeaderName>) -> TestServer {
    let state = build_state().expect("metrics registry");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(state.clone(), trace_header);
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        server
            .run(listener, server_shutdown, DRAIN_GRACE)
            .await
    });

    TestServer {
        addr,
        state,
        shutdown,
        handle,
    }
}

/// An HTTP client that never reuses or proxies connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Parse the value of an unlabelled sample from Prometheus text output.
pub fn sample(output: &str, name: &str) -> Option<f64> {
    output
        .lines()
        .find_map(|line| line.strip_prefix(name)?.strip_prefix(' ')?.parse().ok())
}
