//! Optional query-engine context merged into read responses.
//!
//! A provider may know how a catalog entity maps onto a queryable table.
//! Every lookup may answer "no information"; errors are treated the same way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::context::CallContext;

pub const QUERY_TABLE_KEY: &str = "query_table";
pub const QUERY_TABLE_PATH_KEY: &str = "query_table_path";
pub const QUERY_AVAILABILITY_KEY: &str = "query_availability";
pub const QUERY_EXAMPLES_KEY: &str = "query_examples";
pub const EXECUTION_CONTEXT_KEY: &str = "execution_context";

#[derive(Debug, Error)]
#[error("query context provider failed: {0}")]
pub struct ProviderError(pub String);

pub type ProviderResult<T> = Result<Option<T>, ProviderError>;

/// Fully qualified table an entity is queryable as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub table: String,
}

impl TableIdentity {
    /// Dotted path, skipping absent parts.
    #[must_use]
    pub fn path(&self) -> String {
        [self.catalog.as_deref(), self.schema.as_deref(), Some(self.table.as_str())]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAvailability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Table mappings for a set of urns returned together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub tables: Vec<ExecutionTable>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTable {
    pub urn: String,
    pub table: TableIdentity,
}

#[async_trait]
pub trait QueryContextProvider: Send + Sync {
    async fn resolve_table(
        &self,
        _call: &CallContext,
        _urn: &str,
    ) -> ProviderResult<TableIdentity> {
        Ok(None)
    }

    async fn table_availability(
        &self,
        _call: &CallContext,
        _urn: &str,
    ) -> ProviderResult<TableAvailability> {
        Ok(None)
    }

    async fn query_examples(
        &self,
        _call: &CallContext,
        _urn: &str,
    ) -> ProviderResult<Vec<QueryExample>> {
        Ok(None)
    }

    async fn execution_context(
        &self,
        _call: &CallContext,
        _urns: &[String],
    ) -> ProviderResult<ExecutionContext> {
        Ok(None)
    }
}

fn present<T: Serialize>(key: &str, result: ProviderResult<T>) -> Option<Value> {
    match result {
        Ok(Some(value)) => serde_json::to_value(value).ok(),
        Ok(None) => None,
        Err(err) => {
            debug!(key, error = %err, "query context omitted");
            None
        }
    }
}

/// Entity-level context keys for `urn`.
pub(crate) async fn entity_context(
    provider: &dyn QueryContextProvider,
    call: &CallContext,
    urn: &str,
) -> Map<String, Value> {
    let mut fields = Map::new();
    let table = provider.resolve_table(call, urn).await;
    if let Ok(Some(identity)) = &table {
        fields.insert(QUERY_TABLE_PATH_KEY.to_string(), Value::String(identity.path()));
    }
    if let Some(value) = present(QUERY_TABLE_KEY, table) {
        fields.insert(QUERY_TABLE_KEY.to_string(), value);
    }
    if let Some(value) = present(
        QUERY_AVAILABILITY_KEY,
        provider.table_availability(call, urn).await,
    ) {
        fields.insert(QUERY_AVAILABILITY_KEY.to_string(), value);
    }
    let examples = provider
        .query_examples(call, urn)
        .await
        .map(|examples| examples.filter(|list| !list.is_empty()));
    if let Some(value) = present(QUERY_EXAMPLES_KEY, examples) {
        fields.insert(QUERY_EXAMPLES_KEY.to_string(), value);
    }
    fields
}

/// Execution context for a result set; `None` when there is nothing to add.
pub(crate) async fn execution_context(
    provider: &dyn QueryContextProvider,
    call: &CallContext,
    urns: &[String],
) -> Option<Value> {
    if urns.is_empty() {
        return None;
    }
    let context = provider
        .execution_context(call, urns)
        .await
        .map(|context| context.filter(|context| !context.tables.is_empty()));
    present(EXECUTION_CONTEXT_KEY, context)
}

/// Merges `fields` into the top level of `payload` without replacing
/// existing keys. Non-object payloads are returned unchanged.
pub(crate) fn merge_top_level(mut payload: Value, fields: Map<String, Value>) -> Value {
    if let Value::Object(object) = &mut payload {
        for (key, value) in fields {
            object.entry(key).or_insert(value);
        }
    }
    payload
}
