//! Catalog data model shared by the client, connection layer and tools.
//!
//! These types mirror the JSON payloads the tools emit, so field names here are
//! part of the public tool output contract.

pub mod models;
pub mod schema;

pub use models::*;
