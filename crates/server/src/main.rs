//! swcache worker entry point.
//!
//! Loads configuration and manifests, runs install and activate against the
//! cache database, then serves the reconciler over MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_client::{ChannelSink, FetchClient, FetchConfig, Manifests, Reconciler};
use swcache_core::{AppConfig, CacheDb, Manifest};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;
    let origin = config.origin_url()?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache database {}", config.db_path.display()))?;
    let manifests = Manifests {
        precache: Manifest::load(&origin, &config.precache_manifest)?,
        runtime: Manifest::load(&origin, &config.runtime_manifest)?,
    };
    tracing::info!(
        origin = %origin,
        precache_entries = manifests.precache.len(),
        runtime_entries = manifests.runtime.len(),
        "manifests loaded"
    );

    let fetcher = FetchClient::new(FetchConfig::from(&config))?;
    let (sink, messages) = ChannelSink::new();
    let reconciler = Reconciler::from_config(&config, db, Arc::new(fetcher), Arc::new(sink), manifests);

    reconciler.install().await;
    reconciler.activate().await;

    tracing::info!("Starting swcache worker on stdio transport");

    let handler = handler::WorkerServer::new(Arc::new(reconciler), messages, origin);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
