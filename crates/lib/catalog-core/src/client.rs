//! Capability interface for the remote catalog.
//!
//! The tool layer only talks to the catalog through [`CatalogClient`]. Every
//! operation has a default body returning [`ClientError::Unsupported`], so a
//! backend may expose a subset of the catalog surface.

use async_trait::async_trait;
use catalog_store::models::{
    ColumnLineage,
    DataProduct,
    DataProductList,
    DomainList,
    Entity,
    GlossaryTerm,
    LineageDirection,
    LineageResult,
    MutationReport,
    PingReport,
    QueryList,
    SchemaMetadata,
    SearchRequest,
    SearchResult,
    TagList,
};
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("catalog transport error: {0}")]
    Transport(String),
    #[error("catalog returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("catalog query failed: {0}")]
    GraphQl(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to decode catalog response: {0}")]
    Decode(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("operation not supported by this client: {0}")]
    Unsupported(&'static str),
}

/// Lineage traversal parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineageQuery {
    pub direction: LineageDirection,
    pub depth: u32,
    pub limit: usize,
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn search(&self, _request: SearchRequest) -> ClientResult<SearchResult> {
        Err(ClientError::Unsupported("search"))
    }

    async fn get_entity(&self, _urn: &str) -> ClientResult<Entity> {
        Err(ClientError::Unsupported("get_entity"))
    }

    async fn get_schema(&self, _urn: &str) -> ClientResult<SchemaMetadata> {
        Err(ClientError::Unsupported("get_schema"))
    }

    async fn get_lineage(&self, _urn: &str, _query: LineageQuery) -> ClientResult<LineageResult> {
        Err(ClientError::Unsupported("get_lineage"))
    }

    async fn get_column_lineage(&self, _urn: &str) -> ClientResult<ColumnLineage> {
        Err(ClientError::Unsupported("get_column_lineage"))
    }

    async fn get_queries(&self, _urn: &str, _limit: usize) -> ClientResult<QueryList> {
        Err(ClientError::Unsupported("get_queries"))
    }

    async fn get_glossary_term(&self, _urn: &str) -> ClientResult<GlossaryTerm> {
        Err(ClientError::Unsupported("get_glossary_term"))
    }

    async fn list_tags(&self, _filter: Option<&str>, _limit: usize) -> ClientResult<TagList> {
        Err(ClientError::Unsupported("list_tags"))
    }

    async fn list_domains(&self, _limit: usize) -> ClientResult<DomainList> {
        Err(ClientError::Unsupported("list_domains"))
    }

    async fn list_data_products(
        &self,
        _domain_urn: Option<&str>,
        _limit: usize,
    ) -> ClientResult<DataProductList> {
        Err(ClientError::Unsupported("list_data_products"))
    }

    async fn get_data_product(&self, _urn: &str) -> ClientResult<DataProduct> {
        Err(ClientError::Unsupported("get_data_product"))
    }

    async fn ping(&self) -> ClientResult<PingReport> {
        Err(ClientError::Unsupported("ping"))
    }

    async fn update_description(
        &self,
        _urn: &str,
        _description: &str,
        _field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("update_description"))
    }

    async fn add_tag(
        &self,
        _urn: &str,
        _tag_urn: &str,
        _field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("add_tag"))
    }

    async fn remove_tag(
        &self,
        _urn: &str,
        _tag_urn: &str,
        _field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("remove_tag"))
    }

    async fn add_glossary_term(
        &self,
        _urn: &str,
        _term_urn: &str,
        _field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("add_glossary_term"))
    }

    async fn remove_glossary_term(
        &self,
        _urn: &str,
        _term_urn: &str,
        _field_path: Option<&str>,
    ) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("remove_glossary_term"))
    }

    async fn add_link(
        &self,
        _urn: &str,
        _url: &str,
        _description: &str,
    ) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("add_link"))
    }

    async fn remove_link(&self, _urn: &str, _url: &str) -> ClientResult<MutationReport> {
        Err(ClientError::Unsupported("remove_link"))
    }

    /// Releases transport resources. Called once by the connection manager on close.
    async fn close(&self) -> ClientResult<()> {
        Ok(())
    }
}
