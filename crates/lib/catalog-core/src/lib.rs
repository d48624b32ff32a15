//! Core connection layer for catalog-mcp.
//!
//! This crate owns the connection configuration model (a primary connection
//! plus named, field-inheriting overrides), the capability interface every
//! catalog backend implements, and the manager that lazily builds and caches
//! one client per connection name.

pub mod client;
pub mod config;
pub mod services;

pub use client::{CatalogClient, ClientError, ClientResult, LineageQuery};
pub use config::{ClientConfig, ConnectionOverride, ConnectionsConfig, parse_connections_json};
pub use services::{
    BuildClientFn,
    BuildClientFuture,
    ConnectionError,
    ConnectionInfo,
    ConnectionManager,
    SharedClient,
};
