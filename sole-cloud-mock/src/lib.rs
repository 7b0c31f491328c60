//! In-memory mock of the storefront's hosted services
//!
//! One axum app stands in for the realtime database, the email/password
//! auth service, and the image upload host, close enough to the wire for
//! the client to run against it unmodified. Integration tests spawn it on
//! an ephemeral port; `main.rs` runs it standalone as a dev server.

pub mod api;
pub mod state;

pub use state::{CounterSnapshot, MockConfig, MockState};

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A mock cloud bound to a local ephemeral port
///
/// Dropping it aborts the server task.
#[derive(Debug)]
pub struct MockCloud {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockCloud {
    /// Bind 127.0.0.1:0 and serve with the default configuration
    pub async fn spawn() -> std::io::Result<Self> {
        Self::spawn_with(MockConfig::default()).await
    }

    pub async fn spawn_with(config: MockConfig) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(MockState::new(config, format!("http://{addr}")));

        let app = api::router(state.clone());
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("mock cloud server error: {e}");
            }
        });
        tracing::debug!(%addr, "mock cloud listening");

        Ok(Self { addr, state, server })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL; doubles as the database root URL
    pub fn database_url(&self) -> String {
        self.state.base_url.clone()
    }

    pub fn auth_url(&self) -> String {
        format!("{}/v1/accounts:signInWithPassword", self.state.base_url)
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload", self.state.base_url)
    }

    pub fn api_key(&self) -> &str {
        &self.state.config.api_key
    }

    pub fn upload_preset(&self) -> &str {
        &self.state.config.upload_preset
    }

    /// Requests seen per endpoint so far
    pub fn counters(&self) -> CounterSnapshot {
        self.state.counters.snapshot()
    }
}

impl Drop for MockCloud {
    fn drop(&mut self) {
        self.server.abort();
    }
}
