use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, warn};

use crate::client::{CatalogClient, ClientError};
use crate::config::{ClientConfig, ConnectionsConfig};

pub type SharedClient = Arc<dyn CatalogClient>;
pub type BuildClientFuture =
    Pin<Box<dyn Future<Output = Result<SharedClient, ConnectionError>> + Send + 'static>>;
/// Builds a client for a resolved connection. Receives the connection name and
/// its materialized config.
pub type BuildClientFn =
    Arc<dyn Fn(String, ClientConfig) -> BuildClientFuture + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("unknown connection: {name} (available: {})", available.join(", "))]
    UnknownConnection { name: String, available: Vec<String> },
    #[error("invalid connections configuration: {0}")]
    InvalidConnections(String),
    #[error("failed to build client for connection {name}: {message}")]
    BuildFailed { name: String, message: String },
    #[error("failed to close connection {name}: {source}")]
    Close {
        name: String,
        #[source]
        source: ClientError,
    },
}

/// Public description of a configured connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConnectionInfo {
    pub name: String,
    pub url: String,
    pub is_default: bool,
}

/// Resolves connection names to lazily built, shared catalog clients.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ConnectionManagerInner>,
}

/// Internal manager state shared across clones.
struct ConnectionManagerInner {
    config: ConnectionsConfig,
    entries: RwLock<HashMap<String, Arc<ClientEntry>>>,
    /// Shared by `client` from lookup through build, exclusive in `close`.
    lifecycle: RwLock<()>,
    build_client: BuildClientFn,
}

/// Cache slot for one connection. The cell stays empty until a build succeeds.
struct ClientEntry {
    client: OnceCell<SharedClient>,
}

impl ConnectionManager {
    pub fn new(config: ConnectionsConfig, build_client: BuildClientFn) -> Self {
        Self {
            inner: Arc::new(ConnectionManagerInner {
                config,
                entries: RwLock::new(HashMap::new()),
                lifecycle: RwLock::new(()),
                build_client,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionsConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn default_name(&self) -> &str {
        &self.inner.config.default_name
    }

    /// Resolves a connection name to its materialized config.
    ///
    /// # Errors
    /// Returns `ConnectionError::UnknownConnection` listing the valid names.
    pub fn resolve(&self, name: &str) -> Result<ClientConfig, ConnectionError> {
        let config = &self.inner.config;
        if config.is_default(name) {
            return Ok(config.primary.clone());
        }
        config.overrides.get(name).map_or_else(
            || {
                Err(ConnectionError::UnknownConnection {
                    name: name.to_string(),
                    available: self.connection_names(),
                })
            },
            |value| Ok(value.apply(&config.primary)),
        )
    }

    /// Returns the cached client for `name`, building it on first access.
    ///
    /// Concurrent first calls for the same name share a single build. A failed
    /// build leaves the slot empty so the next call tries again. A concurrent
    /// `close` waits for builds already in flight.
    ///
    /// # Errors
    /// Returns resolution errors and build failures.
    pub async fn client(&self, name: &str) -> Result<SharedClient, ConnectionError> {
        let config = self.resolve(name)?;
        let key = self.inner.config.cache_key(name).to_string();
        let open = self.inner.lifecycle.read().await;

        let entry = {
            let map = self.inner.entries.read().await;
            map.get(&key).cloned()
        };

        let entry = match entry {
            Some(entry) => entry,
            None => {
                let mut map = self.inner.entries.write().await;
                map.entry(key.clone())
                    .or_insert_with(|| {
                        Arc::new(ClientEntry {
                            client: OnceCell::new(),
                        })
                    })
                    .clone()
            }
        };

        let build_client = self.inner.build_client.clone();
        let client = entry
            .client
            .get_or_try_init(|| {
                debug!(connection = %key, url = %config.url, "building catalog client");
                (build_client)(key.clone(), config)
            })
            .await?
            .clone();
        drop(open);
        Ok(client)
    }

    /// Closes every cached client and empties the cache.
    ///
    /// In-flight builds finish first and their clients are closed too. All
    /// clients are closed even when some fail; the first failure is returned.
    ///
    /// # Errors
    /// Returns `ConnectionError::Close` for the first client that failed to close.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let closing = self.inner.lifecycle.write().await;
        let drained: Vec<(String, Arc<ClientEntry>)> = {
            let mut map = self.inner.entries.write().await;
            map.drain().collect()
        };

        let mut first_error = None;
        for (name, entry) in drained {
            let Some(client) = entry.client.get() else {
                continue;
            };
            if let Err(source) = client.close().await {
                warn!(connection = %name, error = %source, "failed to close catalog client");
                if first_error.is_none() {
                    first_error = Some(ConnectionError::Close { name, source });
                }
            }
        }
        drop(closing);

        first_error.map_or(Ok(()), Err)
    }

    /// Number of configured connections, including the primary.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        1 + self.inner.config.override_names().count()
    }

    /// Configured connection names, default first.
    #[must_use]
    pub fn connection_names(&self) -> Vec<String> {
        let config = &self.inner.config;
        std::iter::once(config.default_name.clone())
            .chain(config.override_names().map(str::to_string))
            .collect()
    }

    /// Describes every configured connection; exactly one entry is the default.
    #[must_use]
    pub fn connection_infos(&self) -> Vec<ConnectionInfo> {
        let config = &self.inner.config;
        let primary = ConnectionInfo {
            name: config.default_name.clone(),
            url: config.primary.url.clone(),
            is_default: true,
        };
        std::iter::once(primary)
            .chain(config.override_names().map(|name| ConnectionInfo {
                name: name.to_string(),
                url: config.overrides[name].apply(&config.primary).url,
                is_default: false,
            }))
            .collect()
    }

    /// Number of clients currently materialized.
    pub async fn cached_count(&self) -> usize {
        let map = self.inner.entries.read().await;
        map.values()
            .filter(|entry| entry.client.initialized())
            .count()
    }
}
