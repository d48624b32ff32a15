//! Stable tool identifiers and their compiled-in metadata.

use std::fmt;
use std::str::FromStr;

use catalog_store::models::{
    ColumnLineage,
    DataProduct,
    DataProductList,
    DomainList,
    Entity,
    GlossaryTerm,
    LineageResult,
    MutationReport,
    PingReport,
    QueryList,
    SchemaMetadata,
    SearchResult,
    TagList,
};
use rmcp::schemars::{self, JsonSchema};
use serde_json::Value;
use thiserror::Error;

use crate::host::{JsonObject, ToolAnnotations};
use crate::tools::params::{
    AddLinkParams,
    ConnectionList,
    ConnectionParams,
    GlossaryTermParams,
    LineageParams,
    ListConnectionsParams,
    ListDataProductsParams,
    ListDomainsParams,
    ListTagsParams,
    QueriesParams,
    RemoveLinkParams,
    SearchParams,
    TagParams,
    UpdateDescriptionParams,
    UrnParams,
};

/// Prefix shared by every published tool name.
pub const TOOL_PREFIX: &str = "catalog_";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tool: {0}")]
pub struct UnknownToolName(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolName {
    Search,
    GetEntity,
    GetSchema,
    GetLineage,
    GetColumnLineage,
    GetQueries,
    GetGlossaryTerm,
    ListTags,
    ListDomains,
    ListDataProducts,
    GetDataProduct,
    ListConnections,
    Ping,
    UpdateDescription,
    AddTag,
    RemoveTag,
    AddGlossaryTerm,
    RemoveGlossaryTerm,
    AddLink,
    RemoveLink,
}

impl ToolName {
    pub const READ: [Self; 13] = [
        Self::Search,
        Self::GetEntity,
        Self::GetSchema,
        Self::GetLineage,
        Self::GetColumnLineage,
        Self::GetQueries,
        Self::GetGlossaryTerm,
        Self::ListTags,
        Self::ListDomains,
        Self::ListDataProducts,
        Self::GetDataProduct,
        Self::ListConnections,
        Self::Ping,
    ];

    pub const WRITE: [Self; 7] = [
        Self::UpdateDescription,
        Self::AddTag,
        Self::RemoveTag,
        Self::AddGlossaryTerm,
        Self::RemoveGlossaryTerm,
        Self::AddLink,
        Self::RemoveLink,
    ];

    /// Every tool, read tools first.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::READ.into_iter().chain(Self::WRITE)
    }

    /// Published tool name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "catalog_search",
            Self::GetEntity => "catalog_get_entity",
            Self::GetSchema => "catalog_get_schema",
            Self::GetLineage => "catalog_get_lineage",
            Self::GetColumnLineage => "catalog_get_column_lineage",
            Self::GetQueries => "catalog_get_queries",
            Self::GetGlossaryTerm => "catalog_get_glossary_term",
            Self::ListTags => "catalog_list_tags",
            Self::ListDomains => "catalog_list_domains",
            Self::ListDataProducts => "catalog_list_data_products",
            Self::GetDataProduct => "catalog_get_data_product",
            Self::ListConnections => "catalog_list_connections",
            Self::Ping => "catalog_ping",
            Self::UpdateDescription => "catalog_update_description",
            Self::AddTag => "catalog_add_tag",
            Self::RemoveTag => "catalog_remove_tag",
            Self::AddGlossaryTerm => "catalog_add_glossary_term",
            Self::RemoveGlossaryTerm => "catalog_remove_glossary_term",
            Self::AddLink => "catalog_add_link",
            Self::RemoveLink => "catalog_remove_link",
        }
    }

    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(
            self,
            Self::UpdateDescription
                | Self::AddTag
                | Self::RemoveTag
                | Self::AddGlossaryTerm
                | Self::RemoveGlossaryTerm
                | Self::AddLink
                | Self::RemoveLink
        )
    }

    #[must_use]
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Search => "Search catalog",
            Self::GetEntity => "Get entity",
            Self::GetSchema => "Get schema",
            Self::GetLineage => "Get lineage",
            Self::GetColumnLineage => "Get column lineage",
            Self::GetQueries => "Get saved queries",
            Self::GetGlossaryTerm => "Get glossary term",
            Self::ListTags => "List tags",
            Self::ListDomains => "List domains",
            Self::ListDataProducts => "List data products",
            Self::GetDataProduct => "Get data product",
            Self::ListConnections => "List connections",
            Self::Ping => "Ping catalog",
            Self::UpdateDescription => "Update description",
            Self::AddTag => "Add tag",
            Self::RemoveTag => "Remove tag",
            Self::AddGlossaryTerm => "Add glossary term",
            Self::RemoveGlossaryTerm => "Remove glossary term",
            Self::AddLink => "Add link",
            Self::RemoveLink => "Remove link",
        }
    }

    #[must_use]
    pub const fn default_description(self) -> &'static str {
        match self {
            Self::Search => {
                "Search the catalog for datasets, dashboards, charts, pipelines and other entities. \
                 Filter by entity_type or platform; page with offset and limit."
            }
            Self::GetEntity => {
                "Fetch one entity by urn with owners, tags, glossary terms, domain, links and custom properties."
            }
            Self::GetSchema => "Fetch the schema fields of a dataset, including field tags and terms.",
            Self::GetLineage => {
                "Walk upstream or downstream lineage of an entity up to the requested depth."
            }
            Self::GetColumnLineage => "Fetch field-level lineage mappings for a dataset.",
            Self::GetQueries => "List saved queries attached to a dataset.",
            Self::GetGlossaryTerm => {
                "Fetch a glossary term with its definition, parent node and related terms."
            }
            Self::ListTags => "List tags, optionally filtered by name.",
            Self::ListDomains => "List domains with their entity counts.",
            Self::ListDataProducts => "List data products, optionally within one domain.",
            Self::GetDataProduct => "Fetch a data product with its member assets.",
            Self::ListConnections => {
                "List configured catalog connections. Pass a name as `connection` to other tools."
            }
            Self::Ping => "Check that the catalog is reachable and report its version.",
            Self::UpdateDescription => {
                "Replace the description of an entity, or of one schema field when field_path is set."
            }
            Self::AddTag => "Attach a tag to an entity or schema field.",
            Self::RemoveTag => "Detach a tag from an entity or schema field.",
            Self::AddGlossaryTerm => "Attach a glossary term to an entity or schema field.",
            Self::RemoveGlossaryTerm => "Detach a glossary term from an entity or schema field.",
            Self::AddLink => "Attach a documentation link to an entity.",
            Self::RemoveLink => "Remove a documentation link from an entity.",
        }
    }

    #[must_use]
    pub const fn default_annotations(self) -> ToolAnnotations {
        match self {
            Self::UpdateDescription | Self::AddTag | Self::AddGlossaryTerm => {
                ToolAnnotations::write(false, true)
            }
            Self::AddLink => ToolAnnotations::write(false, false),
            Self::RemoveTag | Self::RemoveGlossaryTerm | Self::RemoveLink => {
                ToolAnnotations::write(true, true)
            }
            _ => ToolAnnotations::read_only(),
        }
    }

    /// JSON schema of the tool input.
    #[must_use]
    pub fn input_schema(self) -> JsonObject {
        match self {
            Self::Search => schema_for::<SearchParams>(),
            Self::GetEntity
            | Self::GetSchema
            | Self::GetColumnLineage
            | Self::GetGlossaryTerm
            | Self::GetDataProduct => schema_for::<UrnParams>(),
            Self::GetLineage => schema_for::<LineageParams>(),
            Self::GetQueries => schema_for::<QueriesParams>(),
            Self::ListTags => schema_for::<ListTagsParams>(),
            Self::ListDomains => schema_for::<ListDomainsParams>(),
            Self::ListDataProducts => schema_for::<ListDataProductsParams>(),
            Self::ListConnections => schema_for::<ListConnectionsParams>(),
            Self::Ping => schema_for::<ConnectionParams>(),
            Self::UpdateDescription => schema_for::<UpdateDescriptionParams>(),
            Self::AddTag | Self::RemoveTag => schema_for::<TagParams>(),
            Self::AddGlossaryTerm | Self::RemoveGlossaryTerm => schema_for::<GlossaryTermParams>(),
            Self::AddLink => schema_for::<AddLinkParams>(),
            Self::RemoveLink => schema_for::<RemoveLinkParams>(),
        }
    }

    /// Compiled-in output schema for the structured result.
    #[must_use]
    pub fn default_output_schema(self) -> Option<JsonObject> {
        let schema = match self {
            Self::Search => schema_for::<SearchResult>(),
            Self::GetEntity => schema_for::<Entity>(),
            Self::GetSchema => schema_for::<SchemaMetadata>(),
            Self::GetLineage => schema_for::<LineageResult>(),
            Self::GetColumnLineage => schema_for::<ColumnLineage>(),
            Self::GetQueries => schema_for::<QueryList>(),
            Self::GetGlossaryTerm => schema_for::<GlossaryTerm>(),
            Self::ListTags => schema_for::<TagList>(),
            Self::ListDomains => schema_for::<DomainList>(),
            Self::ListDataProducts => schema_for::<DataProductList>(),
            Self::GetDataProduct => schema_for::<DataProduct>(),
            Self::ListConnections => schema_for::<ConnectionList>(),
            Self::Ping => schema_for::<PingReport>(),
            _ => schema_for::<MutationReport>(),
        };
        (!schema.is_empty()).then_some(schema)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = UnknownToolName;

    /// Accepts the published name or the name without the `catalog_` prefix.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let full = if trimmed.starts_with(TOOL_PREFIX) {
            trimmed.to_string()
        } else {
            format!("{TOOL_PREFIX}{trimmed}")
        };
        Self::all()
            .find(|name| name.as_str() == full)
            .ok_or_else(|| UnknownToolName(value.to_string()))
    }
}

fn schema_for<T: JsonSchema>() -> JsonObject {
    match serde_json::to_value(schemars::schema_for!(T)) {
        Ok(Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_prefixed() {
        let names: HashSet<&str> = ToolName::all().map(ToolName::as_str).collect();
        assert_eq!(names.len(), ToolName::READ.len() + ToolName::WRITE.len());
        assert!(names.iter().all(|name| name.starts_with(TOOL_PREFIX)));
    }

    #[test]
    fn write_set_matches_flag() {
        assert!(ToolName::WRITE.iter().all(|name| name.is_write()));
        assert!(ToolName::READ.iter().all(|name| !name.is_write()));
    }

    #[test]
    fn parses_full_and_short_names() {
        assert_eq!("catalog_search".parse::<ToolName>(), Ok(ToolName::Search));
        assert_eq!("get_lineage".parse::<ToolName>(), Ok(ToolName::GetLineage));
        assert_eq!(
            "catalog_serach".parse::<ToolName>(),
            Err(UnknownToolName("catalog_serach".to_string()))
        );
    }

    #[test]
    fn schemas_are_objects() {
        for name in ToolName::all() {
            let input = name.input_schema();
            assert_eq!(input.get("type").and_then(Value::as_str), Some("object"), "{name}");
            let output = name.default_output_schema().expect("output schema");
            assert_eq!(output.get("type").and_then(Value::as_str), Some("object"), "{name}");
        }
    }

    #[test]
    fn search_input_documents_the_connection_field() {
        let schema = ToolName::Search.input_schema();
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .expect("properties");
        assert!(properties.contains_key("connection"));
        assert!(properties.contains_key("query"));
    }

    #[test]
    fn removals_are_destructive() {
        assert_eq!(
            ToolName::RemoveTag.default_annotations().destructive_hint,
            Some(true)
        );
        assert_eq!(ToolName::Search.default_annotations().read_only_hint, Some(true));
    }
}
