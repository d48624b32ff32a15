//! Transport runners for [`CatalogMcp`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use rmcp::transport::streamable_http_server::{
    StreamableHttpServerConfig,
    StreamableHttpService,
    session::local::LocalSessionManager,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::CatalogMcp;

pub type ServeError = Box<dyn std::error::Error + Send + Sync>;

pub const DEFAULT_HTTP_ADDR: SocketAddr =
    SocketAddr::V4(std::net::SocketAddrV4::new(std::net::Ipv4Addr::LOCALHOST, 4020));

/// Streamable HTTP transport settings.
#[derive(Debug, Clone)]
pub struct McpHttpServerConfig {
    pub addr: SocketAddr,
    pub stateful_mode: bool,
    pub sse_keep_alive: Option<Duration>,
    pub sse_retry: Option<Duration>,
}

impl McpHttpServerConfig {
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
        }
    }

    #[must_use]
    pub const fn with_stateful_mode(mut self, stateful_mode: bool) -> Self {
        self.stateful_mode = stateful_mode;
        self
    }

    #[must_use]
    pub const fn with_sse_keep_alive(mut self, sse_keep_alive: Option<Duration>) -> Self {
        self.sse_keep_alive = sse_keep_alive;
        self
    }
}

impl Default for McpHttpServerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_ADDR)
    }
}

/// Serves `server` over stdio until the peer disconnects or `shutdown` fires.
///
/// # Errors
/// Returns any transport or server error.
pub async fn serve_stdio(
    server: CatalogMcp,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    let running = serve_server(server, stdio()).await?;
    let cancel = running.cancellation_token();
    tokio::select! {
        result = running.waiting() => {
            result?;
        }
        () = shutdown.cancelled() => {
            info!("stdio transport shutting down");
            cancel.cancel();
        }
    }
    Ok(())
}

/// Builds the HTTP router: MCP under `/mcp` and a `/health` probe.
#[must_use]
pub fn router(server: CatalogMcp, config: &McpHttpServerConfig) -> Router {
    let service: StreamableHttpService<CatalogMcp, LocalSessionManager> =
        StreamableHttpService::new(
            move || Ok(server.clone()),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                sse_keep_alive: config.sse_keep_alive,
                sse_retry: config.sse_retry,
                stateful_mode: config.stateful_mode,
                ..Default::default()
            },
        );
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest_service("/mcp", service)
}

/// Serves `server` over streamable HTTP until `shutdown` fires.
///
/// # Errors
/// Returns any listener or server error.
pub async fn serve_streamable_http(
    server: CatalogMcp,
    config: McpHttpServerConfig,
    shutdown: CancellationToken,
) -> Result<(), ServeError> {
    let app = router(server, &config);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %listener.local_addr()?, "serving MCP over streamable HTTP");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
