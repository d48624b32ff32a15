//! Tool handlers.
//!
//! Every handler follows the same shape: parse typed params, pick the
//! connection, call the client while watching for cancellation, and serialize
//! the result. Failures before the catalog answers become soft failures.

pub mod params;
mod read;
mod write;

use std::future::Future;
use std::sync::Arc;

use catalog_core::client::ClientError;
use catalog_core::config::ClientConfig;
use catalog_core::services::{ConnectionError, ConnectionManager, SharedClient};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{CallContext, ToolCallError, ToolFuture, ToolHandler, ToolOutput};
use crate::query_context::QueryContextProvider;
use crate::registry::ToolName;

/// Message returned by every write tool while write mode is off.
pub const WRITE_DISABLED_MESSAGE: &str =
    "write operations are disabled; enable write mode to modify catalog metadata";

pub const DEFAULT_LINEAGE_DEPTH: u32 = 1;
pub const MAX_LINEAGE_DEPTH: u32 = 5;

/// Immutable state shared by every handler of one toolkit.
pub(crate) struct ToolState {
    pub(crate) connections: ConnectionManager,
    pub(crate) write_enabled: bool,
    pub(crate) query_context: Option<Arc<dyn QueryContextProvider>>,
}

/// Why a handler stopped early.
#[derive(Debug)]
pub(crate) enum Failure {
    Cancelled,
    Soft(String),
}

impl Failure {
    pub(crate) fn soft(message: impl Into<String>) -> Self {
        Self::Soft(message.into())
    }
}

impl From<ClientError> for Failure {
    fn from(err: ClientError) -> Self {
        Self::Soft(err.to_string())
    }
}

impl From<ConnectionError> for Failure {
    fn from(err: ConnectionError) -> Self {
        Self::Soft(err.to_string())
    }
}

pub(crate) type Outcome<T> = Result<T, Failure>;

/// Client and resolved config for the connection a call targets.
pub(crate) struct Target {
    pub(crate) client: SharedClient,
    pub(crate) config: ClientConfig,
}

impl ToolState {
    pub(crate) async fn target(
        &self,
        call: &CallContext,
        connection: Option<&str>,
    ) -> Outcome<Target> {
        let name = connection
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.connections.default_name())
            .to_string();
        let config = self.connections.resolve(&name)?;
        let client = guarded(call, self.connections.client(&name)).await?;
        Ok(Target { client, config })
    }
}

/// Runs `future` unless the call is cancelled first.
pub(crate) async fn guarded<T, E, F>(call: &CallContext, future: F) -> Outcome<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<Failure>,
{
    tokio::select! {
        biased;
        () = call.cancel.cancelled() => Err(Failure::Cancelled),
        result = future => result.map_err(Into::into),
    }
}

/// Canonical urn from the call context, else the trimmed input.
pub(crate) fn subject_urn(call: &CallContext, raw: &str) -> Outcome<String> {
    let urn = call.canonical_urn().unwrap_or(raw).trim();
    if urn.is_empty() {
        return Err(Failure::soft("urn is required"));
    }
    Ok(urn.to_string())
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Outcome<Value> {
    serde_json::to_value(value)
        .map_err(|err| Failure::soft(format!("failed to serialize tool output: {err}")))
}

fn parse_params<P: DeserializeOwned>(input: Value) -> Result<P, ToolOutput> {
    let input = if input.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        input
    };
    serde_json::from_value(input)
        .map_err(|err| ToolOutput::error(format!("invalid parameters: {err}")))
}

fn finish(outcome: Outcome<ToolOutput>) -> Result<ToolOutput, ToolCallError> {
    match outcome {
        Ok(output) => Ok(output),
        Err(Failure::Cancelled) => Err(ToolCallError::Cancelled),
        Err(Failure::Soft(message)) => Ok(ToolOutput::error(message)),
    }
}

fn tool<P, F, Fut>(state: Arc<ToolState>, write: bool, run: F) -> ToolHandler
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(Arc<ToolState>, CallContext, P) -> Fut + Copy + Send + Sync + 'static,
    Fut: Future<Output = Outcome<ToolOutput>> + Send + 'static,
{
    Arc::new(move |call: CallContext, input: Value| -> ToolFuture {
        let state = Arc::clone(&state);
        Box::pin(async move {
            if write && !state.write_enabled {
                return Ok(ToolOutput::error(WRITE_DISABLED_MESSAGE));
            }
            if call.is_cancelled() {
                return Err(ToolCallError::Cancelled);
            }
            match parse_params::<P>(input) {
                Ok(params) => finish(run(state, call, params).await),
                Err(output) => Ok(output),
            }
        })
    })
}

/// Base handler for `name`, before any middleware.
pub(crate) fn handler(name: ToolName, state: Arc<ToolState>) -> ToolHandler {
    match name {
        ToolName::Search => tool(state, false, read::search),
        ToolName::GetEntity => tool(state, false, read::get_entity),
        ToolName::GetSchema => tool(state, false, read::get_schema),
        ToolName::GetLineage => tool(state, false, read::get_lineage),
        ToolName::GetColumnLineage => tool(state, false, read::get_column_lineage),
        ToolName::GetQueries => tool(state, false, read::get_queries),
        ToolName::GetGlossaryTerm => tool(state, false, read::get_glossary_term),
        ToolName::ListTags => tool(state, false, read::list_tags),
        ToolName::ListDomains => tool(state, false, read::list_domains),
        ToolName::ListDataProducts => tool(state, false, read::list_data_products),
        ToolName::GetDataProduct => tool(state, false, read::get_data_product),
        ToolName::ListConnections => tool(state, false, read::list_connections),
        ToolName::Ping => tool(state, false, read::ping),
        ToolName::UpdateDescription => tool(state, true, write::update_description),
        ToolName::AddTag => tool(state, true, write::add_tag),
        ToolName::RemoveTag => tool(state, true, write::remove_tag),
        ToolName::AddGlossaryTerm => tool(state, true, write::add_glossary_term),
        ToolName::RemoveGlossaryTerm => tool(state, true, write::remove_glossary_term),
        ToolName::AddLink => tool(state, true, write::add_link),
        ToolName::RemoveLink => tool(state, true, write::remove_link),
    }
}
