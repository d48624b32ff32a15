//! Daemon entry point for the catalog MCP server.
//!
//! Loads configuration from CLI flags and the environment, builds the catalog
//! connections, registers the tool set and serves MCP over stdio or streamable
//! HTTP until interrupted.

mod config;
mod connections;
mod logging;

use catalog_mcp::server::{McpHttpServerConfig, serve_stdio, serve_streamable_http};
use catalog_mcp::{CatalogMcp, Toolkit, ToolkitOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::CatalogConfig;
use crate::connections::build_connections;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = CatalogConfig::from_args()?;
    logging::init_tracing(config.log_format);

    let options = ToolkitOptions::default().with_write_enabled(config.write_enabled);
    let mut toolkit = Toolkit::new(build_connections(&config), options);
    let server = CatalogMcp::from_toolkit(&mut toolkit);
    info!(
        tools = toolkit.registered().len(),
        write_enabled = toolkit.write_enabled(),
        "catalog tools registered"
    );

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for shutdown signal");
            return;
        }
        info!("shutdown requested");
        signal.cancel();
    });

    let served = if config.enable_stdio {
        serve_stdio(server, shutdown).await
    } else {
        let http = McpHttpServerConfig::new(config.mcp_http_addr);
        serve_streamable_http(server, http, shutdown).await
    };

    if let Err(err) = toolkit.connections().close().await {
        error!(error = %err, "failed to close catalog connections");
    }
    served
}
