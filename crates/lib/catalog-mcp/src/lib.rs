//! MCP tool framework for catalog-mcp.
//!
//! This crate turns catalog client operations into MCP tools: typed handlers,
//! an interceptor pipeline, integration adapters, facet overrides, and an rmcp
//! server that hosts whatever a [`Toolkit`] registers on it.

pub mod context;
pub mod host;
pub mod integrations;
pub mod middleware;
pub mod overrides;
pub mod query_context;
pub mod registry;
pub mod server;
pub mod toolkit;
pub mod tools;

use std::collections::BTreeMap;
use std::sync::Arc;

use rmcp::model::{
    CallToolRequestParams,
    CallToolResult,
    Content,
    ErrorCode,
    ListToolsResult,
    PaginatedRequestParams,
    ServerCapabilities,
    ServerInfo,
    Tool,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use serde_json::Value;
use tracing::warn;

pub use context::{CallContext, ToolCallError, ToolContext, ToolHandler, ToolOutput};
pub use host::{ToolAnnotations, ToolDefinition, ToolHost, ToolIcon};
pub use integrations::Integrations;
pub use middleware::{Middleware, MiddlewareError, Pipeline, SharedMiddleware};
pub use registry::ToolName;
pub use toolkit::{RegisterOptions, Toolkit, ToolkitError, ToolkitOptions};
pub use tools::WRITE_DISABLED_MESSAGE;

/// HTTP header carrying the caller identity on streamable HTTP requests.
pub const CALLER_HEADER: &str = "x-catalog-user";

const SERVER_INSTRUCTIONS: &str = r"catalog-mcp exposes a metadata catalog as MCP tools.

Workflow:
1. Call `catalog_list_connections` to see which catalogs are configured. Every tool accepts an
   optional `connection`; omit it to use the default.
2. Discover entities with `catalog_search`, then inspect them with `catalog_get_entity`,
   `catalog_get_schema`, `catalog_get_lineage`, `catalog_get_column_lineage` and `catalog_get_queries`.
3. Browse governance metadata with `catalog_list_tags`, `catalog_list_domains`,
   `catalog_list_data_products`, `catalog_get_data_product` and `catalog_get_glossary_term`.
4. When write mode is enabled, curate metadata with `catalog_update_description`,
   `catalog_add_tag`/`catalog_remove_tag`, `catalog_add_glossary_term`/`catalog_remove_glossary_term`
   and `catalog_add_link`/`catalog_remove_link`.

Notes:
- Identifiers are URNs of the form `urn:li:<type>:<key>`.
- `limit` is capped by the connection's configured maximum.
- Tags and glossary terms may be given by bare name; they are turned into URNs.
- `catalog_ping` checks that a connection is reachable.";

#[derive(Clone)]
struct RegisteredTool {
    definition: ToolDefinition,
    tool: Tool,
    handler: ToolHandler,
}

/// rmcp server hosting the tools a [`Toolkit`] registers on it.
#[derive(Clone, Default)]
pub struct CatalogMcp {
    tools: Arc<BTreeMap<String, RegisteredTool>>,
}

impl CatalogMcp {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a server with every tool `toolkit` is configured to publish.
    #[must_use]
    pub fn from_toolkit(toolkit: &mut Toolkit) -> Self {
        let mut server = Self::new();
        toolkit.register_all(&mut server);
        server
    }

    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|registered| &registered.definition)
    }

    /// Dispatches a call to the registered handler.
    ///
    /// # Errors
    /// Returns an error for unknown tools and cancelled calls. Tool failures
    /// are reported in the result with `is_error` set.
    pub async fn invoke(
        &self,
        name: &str,
        call: CallContext,
        arguments: Value,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(registered) = self.tools.get(name) else {
            return Err(ErrorData::invalid_params(format!("unknown tool: {name}"), None));
        };
        match (registered.handler)(call, arguments).await {
            Ok(output) => Ok(to_call_result(output)),
            Err(ToolCallError::Cancelled) => Err(ErrorData::new(
                ErrorCode::INTERNAL_ERROR,
                format!("tool call cancelled: {name}"),
                None,
            )),
        }
    }
}

impl ToolHost for CatalogMcp {
    fn add_tool(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        let tool = to_rmcp_tool(&definition);
        Arc::make_mut(&mut self.tools).insert(
            definition.name.clone(),
            RegisteredTool {
                definition,
                tool,
                handler,
            },
        );
    }
}

fn to_rmcp_tool(definition: &ToolDefinition) -> Tool {
    serde_json::to_value(definition)
        .and_then(serde_json::from_value)
        .unwrap_or_else(|err| {
            warn!(tool = %definition.name, error = %err, "publishing tool without optional facets");
            Tool::new(
                definition.name.clone(),
                definition.description.clone().unwrap_or_default(),
                Arc::new(definition.input_schema.clone()),
            )
        })
}

fn to_call_result(output: ToolOutput) -> CallToolResult {
    let content = vec![Content::text(output.text)];
    let mut result = if output.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    };
    result.structured_content = output.structured;
    result
}

fn caller_of(context: &RequestContext<RoleServer>) -> Option<String> {
    let parts = context.extensions.get::<axum::http::request::Parts>()?;
    parts
        .headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

impl ServerHandler for CatalogMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tools.values().map(|registered| registered.tool.clone()).collect(),
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let mut call = CallContext::new(context.ct.clone());
        if let Some(caller) = caller_of(&context) {
            call = call.with_caller(caller);
        }
        let arguments = request.arguments.map_or(Value::Null, Value::Object);
        self.invoke(&request.name, call, arguments).await
    }
}
