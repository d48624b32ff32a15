use catalog_core::services::ConnectionManager;
use catalog_http::http_client_factory;
use tracing::info;

use crate::config::CatalogConfig;

/// Builds the connection manager backed by HTTP catalog clients.
pub fn build_connections(config: &CatalogConfig) -> ConnectionManager {
    let manager = ConnectionManager::new(config.connections.clone(), http_client_factory());
    for connection in manager.connection_infos() {
        info!(
            name = %connection.name,
            url = %connection.url,
            default = connection.is_default,
            "configured catalog connection"
        );
    }
    manager
}
