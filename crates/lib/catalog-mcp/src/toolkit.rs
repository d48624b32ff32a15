//! Composition root: turns a connection manager plus options into tool
//! registrations on a [`ToolHost`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use catalog_core::services::ConnectionManager;
use thiserror::Error;
use tracing::{debug, warn};

use crate::host::{JsonObject, ToolAnnotations, ToolDefinition, ToolHost, ToolIcon};
use crate::integrations::Integrations;
use crate::middleware::{Pipeline, SharedMiddleware};
use crate::overrides::{FacetOverrides, FacetValues, bulk_insert};
use crate::query_context::QueryContextProvider;
use crate::registry::ToolName;
use crate::tools::{self, ToolState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolkitError {
    #[error("unknown tools: {}", .0.join(", "))]
    UnknownTool(Vec<String>),
}

/// Toolkit-wide settings fixed at construction.
#[derive(Clone, Default)]
pub struct ToolkitOptions {
    write_enabled: bool,
    middlewares: Vec<SharedMiddleware>,
    tool_middlewares: HashMap<ToolName, Vec<SharedMiddleware>>,
    integrations: Integrations,
    query_context: Option<Arc<dyn QueryContextProvider>>,
    facets: FacetOverrides,
}

impl fmt::Debug for ToolkitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolkitOptions")
            .field("write_enabled", &self.write_enabled)
            .field("middlewares", &self.middlewares.len())
            .field("tool_middlewares", &self.tool_middlewares.len())
            .field("integrations", &self.integrations)
            .field("query_context", &self.query_context.is_some())
            .field("facets", &self.facets)
            .finish()
    }
}

impl ToolkitOptions {
    #[must_use]
    pub const fn with_write_enabled(mut self, enabled: bool) -> Self {
        self.write_enabled = enabled;
        self
    }

    /// Adds a middleware applied to every tool.
    #[must_use]
    pub fn with_middleware(mut self, middleware: SharedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Adds a middleware applied to `name` only.
    #[must_use]
    pub fn with_tool_middleware(mut self, name: ToolName, middleware: SharedMiddleware) -> Self {
        self.tool_middlewares.entry(name).or_default().push(middleware);
        self
    }

    #[must_use]
    pub fn with_integrations(mut self, integrations: Integrations) -> Self {
        self.integrations = integrations;
        self
    }

    #[must_use]
    pub fn with_query_context(mut self, provider: Arc<dyn QueryContextProvider>) -> Self {
        self.query_context = Some(provider);
        self
    }

    #[must_use]
    pub fn with_descriptions(
        mut self,
        names: impl IntoIterator<Item = ToolName>,
        description: impl Into<String>,
    ) -> Self {
        bulk_insert(&mut self.facets.descriptions, names, &description.into());
        self
    }

    #[must_use]
    pub fn with_titles(
        mut self,
        names: impl IntoIterator<Item = ToolName>,
        title: impl Into<String>,
    ) -> Self {
        bulk_insert(&mut self.facets.titles, names, &title.into());
        self
    }

    #[must_use]
    pub fn with_icons(
        mut self,
        names: impl IntoIterator<Item = ToolName>,
        icons: Vec<ToolIcon>,
    ) -> Self {
        bulk_insert(&mut self.facets.icons, names, &icons);
        self
    }

    #[must_use]
    pub fn with_annotations(
        mut self,
        names: impl IntoIterator<Item = ToolName>,
        annotations: ToolAnnotations,
    ) -> Self {
        bulk_insert(&mut self.facets.annotations, names, &annotations);
        self
    }

    #[must_use]
    pub fn with_output_schemas(
        mut self,
        names: impl IntoIterator<Item = ToolName>,
        schema: JsonObject,
    ) -> Self {
        bulk_insert(&mut self.facets.output_schemas, names, &schema);
        self
    }

    #[must_use]
    pub const fn write_enabled(&self) -> bool {
        self.write_enabled
    }
}

/// Settings for a single `register_with` call.
#[derive(Clone, Default)]
pub struct RegisterOptions {
    middlewares: Vec<SharedMiddleware>,
    facets: FacetValues,
}

impl RegisterOptions {
    #[must_use]
    pub fn with_middleware(mut self, middleware: SharedMiddleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.facets.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.facets.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_icons(mut self, icons: Vec<ToolIcon>) -> Self {
        self.facets.icons = Some(icons);
        self
    }

    #[must_use]
    pub const fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.facets.annotations = Some(annotations);
        self
    }

    #[must_use]
    pub fn with_output_schema(mut self, schema: JsonObject) -> Self {
        self.facets.output_schema = Some(schema);
        self
    }
}

/// Registers catalog tools on a host, each at most once per toolkit.
pub struct Toolkit {
    state: Arc<ToolState>,
    options: ToolkitOptions,
    adapters: Vec<SharedMiddleware>,
    registered: BTreeSet<ToolName>,
}

impl Toolkit {
    #[must_use]
    pub fn new(connections: ConnectionManager, options: ToolkitOptions) -> Self {
        let state = Arc::new(ToolState {
            connections,
            write_enabled: options.write_enabled,
            query_context: options.query_context.clone(),
        });
        let adapters = options.integrations.middlewares();
        Self {
            state,
            options,
            adapters,
            registered: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionManager {
        &self.state.connections
    }

    #[must_use]
    pub fn write_enabled(&self) -> bool {
        self.state.write_enabled
    }

    #[must_use]
    pub fn is_registered(&self, name: ToolName) -> bool {
        self.registered.contains(&name)
    }

    /// Names registered so far, in declaration order.
    #[must_use]
    pub fn registered(&self) -> Vec<ToolName> {
        self.registered.iter().copied().collect()
    }

    pub fn register(&mut self, host: &mut dyn ToolHost, names: &[ToolName]) {
        for &name in names {
            self.register_one(host, name, &RegisterOptions::default());
        }
    }

    /// Registers tools by their string names, with or without the `catalog_` prefix.
    ///
    /// Known names are registered even when some are unknown; the unknown ones
    /// are returned as an error afterwards.
    pub fn register_named(
        &mut self,
        host: &mut dyn ToolHost,
        names: &[&str],
    ) -> Result<(), ToolkitError> {
        let mut unknown = Vec::new();
        for raw in names {
            match raw.parse::<ToolName>() {
                Ok(name) => self.register_one(host, name, &RegisterOptions::default()),
                Err(err) => unknown.push(err.0),
            }
        }
        if unknown.is_empty() {
            Ok(())
        } else {
            warn!(tools = ?unknown, "skipped unknown tool names");
            Err(ToolkitError::UnknownTool(unknown))
        }
    }

    /// Registers every read tool, and every write tool when write mode is on.
    pub fn register_all(&mut self, host: &mut dyn ToolHost) {
        self.register(host, &ToolName::READ);
        if self.state.write_enabled {
            self.register(host, &ToolName::WRITE);
        }
    }

    pub fn register_with(
        &mut self,
        host: &mut dyn ToolHost,
        name: ToolName,
        options: RegisterOptions,
    ) {
        self.register_one(host, name, &options);
    }

    /// Definition `name` would be published with under `options`.
    #[must_use]
    pub fn definition(&self, name: ToolName, options: &RegisterOptions) -> ToolDefinition {
        let facets = self.options.facets.resolve(name, &options.facets);
        ToolDefinition {
            name: name.as_str().to_string(),
            title: facets.title,
            description: facets.description,
            icons: facets.icons,
            annotations: facets.annotations,
            input_schema: name.input_schema(),
            output_schema: facets.output_schema,
        }
    }

    fn pipeline(&self, name: ToolName, options: &RegisterOptions) -> Pipeline {
        let per_tool = self.options.tool_middlewares.get(&name);
        let chain: Vec<SharedMiddleware> = self
            .adapters
            .iter()
            .chain(&self.options.middlewares)
            .chain(per_tool.into_iter().flatten())
            .chain(&options.middlewares)
            .cloned()
            .collect();
        Pipeline::new(chain)
    }

    fn register_one(&mut self, host: &mut dyn ToolHost, name: ToolName, options: &RegisterOptions) {
        if self.registered.contains(&name) {
            debug!(tool = %name, "tool already registered");
            return;
        }
        let definition = self.definition(name, options);
        let pipeline = self.pipeline(name, options);
        let handler = pipeline.wrap(name.as_str(), tools::handler(name, Arc::clone(&self.state)));
        debug!(tool = %name, middlewares = pipeline.len(), "registering tool");
        host.add_tool(definition, handler);
        self.registered.insert(name);
    }
}
