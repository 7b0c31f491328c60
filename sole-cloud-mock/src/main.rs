//! Standalone dev server for the mock cloud
//!
//! Runs the mock database, auth, and upload services on one local port so
//! the client (or the admin_flow example) can be pointed at a live backend
//! without touching the hosted ones.

use std::sync::Arc;

use sole_cloud_mock::{MockConfig, MockState, api};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenv::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sole_cloud_mock=info,tower_http=info".into()),
        )
        .init();

    let port: u16 = std::env::var("SOLE_MOCK_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(9077);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let config = MockConfig::default();
    tracing::info!("sole-cloud-mock listening on {base_url}");
    tracing::info!("  database root : {base_url}");
    tracing::info!(
        "  auth endpoint : {base_url}/v1/accounts:signInWithPassword (key: {})",
        config.api_key
    );
    tracing::info!("  upload target : {base_url}/upload (preset: {})", config.upload_preset);
    for (email, password) in &config.users {
        tracing::info!("  account       : {email} / {password}");
    }

    let state = Arc::new(MockState::new(config, base_url));
    axum::serve(listener, api::router(state)).await?;

    Ok(())
}
