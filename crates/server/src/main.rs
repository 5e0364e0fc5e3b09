//! shopfront server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shopfront_core::catalog::{SeedData, seed};
use shopfront_core::{AppConfig, Catalog};
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

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(
        db_path = %config.db_path.display(),
        revalidate_secs = config.revalidate_secs,
        "Starting shopfront server on stdio transport"
    );

    let catalog = Catalog::open(&config);
    if let Some(path) = &config.seed_file {
        let data = SeedData::from_path(path).with_context(|| format!("reading seed file {}", path.display()))?;
        seed(&catalog, &data).await.context("seeding catalog")?;
    }

    let handler = handler::ShopfrontServer::new(catalog);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
