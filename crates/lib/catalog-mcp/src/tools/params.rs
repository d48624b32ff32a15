//! Tool input and output shapes.
//!
//! Every input accepts an optional `connection` naming the catalog to target;
//! omitted or empty means the default connection.

use catalog_core::services::ConnectionInfo;
use catalog_store::models::LineageDirection;
use rmcp::schemars;
use serde::{Deserialize, Serialize};

/// Parameters for searching catalog entities.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Free-text query. Empty or `*` matches everything.
    #[serde(default)]
    pub query: String,
    /// Restrict to one entity type, e.g. `dataset` or `dashboard`.
    pub entity_type: Option<String>,
    /// Restrict to one platform, e.g. `snowflake`.
    pub platform: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub connection: Option<String>,
}

/// Parameters for tools addressing a single entity by urn.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UrnParams {
    pub urn: String,
    pub connection: Option<String>,
}

/// Parameters for lineage traversal.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct LineageParams {
    pub urn: String,
    /// `upstream` (default) or `downstream`.
    pub direction: Option<LineageDirection>,
    /// Number of hops, 1 to 5. Defaults to 1.
    pub depth: Option<u32>,
    pub limit: Option<usize>,
    pub connection: Option<String>,
}

/// Parameters for listing saved queries of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct QueriesParams {
    pub urn: String,
    pub limit: Option<usize>,
    pub connection: Option<String>,
}

/// Parameters for listing tags.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListTagsParams {
    /// Optional name filter.
    pub filter: Option<String>,
    pub limit: Option<usize>,
    pub connection: Option<String>,
}

/// Parameters for listing domains.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListDomainsParams {
    pub limit: Option<usize>,
    pub connection: Option<String>,
}

/// Parameters for listing data products.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListDataProductsParams {
    /// Only products of this domain.
    pub domain_urn: Option<String>,
    pub limit: Option<usize>,
    pub connection: Option<String>,
}

/// Parameters for tools that only pick a connection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConnectionParams {
    pub connection: Option<String>,
}

/// Parameters for `list_connections`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListConnectionsParams {}

/// Parameters for replacing a description on an entity or one of its fields.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateDescriptionParams {
    pub urn: String,
    pub description: String,
    /// Schema field path; omit to update the entity itself.
    pub field_path: Option<String>,
    pub connection: Option<String>,
}

/// Parameters for adding or removing a tag.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct TagParams {
    pub urn: String,
    /// Tag urn or bare tag name.
    pub tag: String,
    pub field_path: Option<String>,
    pub connection: Option<String>,
}

/// Parameters for adding or removing a glossary term.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GlossaryTermParams {
    pub urn: String,
    /// Glossary term urn or bare term name.
    pub term: String,
    pub field_path: Option<String>,
    pub connection: Option<String>,
}

/// Parameters for attaching a documentation link.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddLinkParams {
    pub urn: String,
    pub url: String,
    /// Link label. Defaults to the url.
    pub description: Option<String>,
    pub connection: Option<String>,
}

/// Parameters for removing a documentation link.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct RemoveLinkParams {
    pub urn: String,
    pub url: String,
    pub connection: Option<String>,
}

/// Output of `list_connections`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ConnectionList {
    pub default: String,
    pub connections: Vec<ConnectionInfo>,
}
