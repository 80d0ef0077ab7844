//! glassboat server entry point.
//!
//! Boots the offline worker behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use glassboat_core::{AppConfig, CacheDb, CacheStore};
use glassboat_worker::{FetchConfig, HttpNetwork, Network};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(app_id = %config.app_id, generation = %config.generation, origin = %config.origin, "Starting glassboat server on stdio transport");

    let store: Arc<dyn CacheStore> = Arc::new(CacheDb::open(&config.db_path).await?);
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::from(&config))?);
    let state = Arc::new(state::AppState::new(config, store, network)?);

    match state.registration.register(state.worker(None)?).await {
        Ok(worker_state) => tracing::info!(state = %worker_state, "configured generation registered"),
        Err(e) => tracing::warn!(error = %e, "configured generation failed to install; requests go to the network"),
    }

    let handler = handler::GlassboatServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
