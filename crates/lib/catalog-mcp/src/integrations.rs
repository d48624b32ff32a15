//! Optional external capabilities plugged into every tool call.
//!
//! Each configured capability becomes one middleware. They always run in the
//! same relative order: urn resolution, access filtering, metadata enrichment,
//! audit logging.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use catalog_store::schema::is_canonical_urn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::{
    ACCESS_CHECKED_KEY,
    CANONICAL_URN_KEY,
    CallContext,
    ToolContext,
    ToolOutput,
};
use crate::middleware::{Middleware, MiddlewareError, SharedMiddleware};
use crate::query_context::{EXECUTION_CONTEXT_KEY, merge_top_level};
use crate::registry::ToolName;

pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Failed(String),
}

/// Maps external identifiers to catalog urns.
#[async_trait]
pub trait UrnResolver: Send + Sync {
    async fn resolve(
        &self,
        call: &CallContext,
        identifier: &str,
    ) -> Result<String, IntegrationError>;
}

#[async_trait]
pub trait AccessFilter: Send + Sync {
    async fn can_access(&self, call: &CallContext, urn: &str) -> Result<bool, IntegrationError>;

    /// Returns the subset of `urns` the caller may see.
    async fn filter_urns(
        &self,
        call: &CallContext,
        urns: &[String],
    ) -> Result<Vec<String>, IntegrationError>;
}

/// Supplies extra top-level fields for single-entity responses.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    async fn enrich(
        &self,
        call: &CallContext,
        urn: &str,
    ) -> Result<Map<String, Value>, IntegrationError>;
}

#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log(&self, record: AuditRecord) -> Result<(), IntegrationError>;
}

/// Extracts the caller identity recorded in audit entries.
pub type UserIdAccessor = Arc<dyn Fn(&CallContext) -> Option<String> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub params: Map<String, Value>,
    pub user_id: Option<String>,
    pub duration_ms: u64,
    pub success: bool,
}

/// Configured integration adapters. All are optional.
#[derive(Clone)]
pub struct Integrations {
    urn_resolver: Option<Arc<dyn UrnResolver>>,
    access_filter: Option<Arc<dyn AccessFilter>>,
    enricher: Option<Arc<dyn MetadataEnricher>>,
    audit_logger: Option<Arc<dyn AuditLogger>>,
    user_id: UserIdAccessor,
    audit_queue_capacity: usize,
}

impl Default for Integrations {
    fn default() -> Self {
        Self {
            urn_resolver: None,
            access_filter: None,
            enricher: None,
            audit_logger: None,
            user_id: Arc::new(|call: &CallContext| call.caller().map(str::to_string)),
            audit_queue_capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
        }
    }
}

impl fmt::Debug for Integrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integrations")
            .field("urn_resolver", &self.urn_resolver.is_some())
            .field("access_filter", &self.access_filter.is_some())
            .field("enricher", &self.enricher.is_some())
            .field("audit_logger", &self.audit_logger.is_some())
            .field("audit_queue_capacity", &self.audit_queue_capacity)
            .finish_non_exhaustive()
    }
}

impl Integrations {
    #[must_use]
    pub fn with_urn_resolver(mut self, resolver: Arc<dyn UrnResolver>) -> Self {
        self.urn_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_access_filter(mut self, filter: Arc<dyn AccessFilter>) -> Self {
        self.access_filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_enricher(mut self, enricher: Arc<dyn MetadataEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    #[must_use]
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = Some(logger);
        self
    }

    #[must_use]
    pub fn with_user_id_accessor(mut self, accessor: UserIdAccessor) -> Self {
        self.user_id = accessor;
        self
    }

    #[must_use]
    pub fn with_audit_queue_capacity(mut self, capacity: usize) -> Self {
        self.audit_queue_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.urn_resolver.is_none()
            && self.access_filter.is_none()
            && self.enricher.is_none()
            && self.audit_logger.is_none()
    }

    /// Builds the adapter middlewares in their fixed order.
    ///
    /// Call once per toolkit: the audit middleware owns the queue shared by
    /// every tool it wraps.
    #[must_use]
    pub fn middlewares(&self) -> Vec<SharedMiddleware> {
        let mut chain: Vec<SharedMiddleware> = Vec::new();
        if let Some(resolver) = &self.urn_resolver {
            chain.push(Arc::new(UrnResolution {
                resolver: Arc::clone(resolver),
            }));
        }
        if let Some(filter) = &self.access_filter {
            chain.push(Arc::new(AccessControl {
                filter: Arc::clone(filter),
            }));
        }
        if let Some(enricher) = &self.enricher {
            chain.push(Arc::new(Enrichment {
                enricher: Arc::clone(enricher),
            }));
        }
        if let Some(logger) = &self.audit_logger {
            chain.push(Arc::new(Audit {
                queue: AuditQueue::new(Arc::clone(logger), self.audit_queue_capacity),
                user_id: Arc::clone(&self.user_id),
            }));
        }
        chain
    }
}

fn input_urn(tool: &ToolContext) -> Option<String> {
    tool.input_str("urn")
        .map(str::trim)
        .filter(|urn| !urn.is_empty())
        .map(str::to_string)
}

struct UrnResolution {
    resolver: Arc<dyn UrnResolver>,
}

#[async_trait]
impl Middleware for UrnResolution {
    async fn before(
        &self,
        call: &mut CallContext,
        tool: &mut ToolContext,
    ) -> Result<(), MiddlewareError> {
        let Some(raw) = input_urn(tool) else {
            return Ok(());
        };
        let canonical = if is_canonical_urn(&raw) {
            raw
        } else {
            let resolved = self
                .resolver
                .resolve(call, &raw)
                .await
                .map_err(|err| MiddlewareError::failed(format!("failed to resolve {raw}: {err}")))?;
            debug!(tool = %tool.tool_name, from = %raw, to = %resolved, "resolved urn");
            resolved
        };
        tool.extra
            .insert(CANONICAL_URN_KEY.to_string(), Value::String(canonical.clone()));
        call.insert(CANONICAL_URN_KEY, Value::String(canonical));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct ListShape {
    items: &'static str,
    count: &'static str,
}

fn list_shape(tool_name: &str) -> Option<ListShape> {
    let (items, count) = match ToolName::from_str(tool_name).ok()? {
        ToolName::Search => ("entities", "total"),
        ToolName::GetLineage => ("nodes", "total"),
        ToolName::ListDataProducts => ("data_products", "total"),
        _ => return None,
    };
    Some(ListShape { items, count })
}

struct AccessControl {
    filter: Arc<dyn AccessFilter>,
}

impl AccessControl {
    async fn filter_list(
        &self,
        call: &CallContext,
        shape: ListShape,
        output: &ToolOutput,
    ) -> Result<Option<ToolOutput>, IntegrationError> {
        let Some(Value::Object(mut payload)) = output.payload() else {
            return Ok(None);
        };
        let Some(Value::Array(items)) = payload.get_mut(shape.items) else {
            return Ok(None);
        };
        if items.is_empty() {
            return Ok(None);
        }
        let urns: Vec<String> = items
            .iter()
            .filter_map(|item| item.get("urn").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        let allowed: HashSet<String> = self
            .filter
            .filter_urns(call, &urns)
            .await?
            .into_iter()
            .collect();
        items.retain(|item| {
            item.get("urn")
                .and_then(Value::as_str)
                .is_some_and(|urn| allowed.contains(urn))
        });
        let count = items.len();
        payload.insert(shape.count.to_string(), Value::from(count));
        prune_execution_context(&mut payload, &allowed);
        Ok(Some(ToolOutput::json_value(Value::Object(payload))))
    }
}

/// Drops execution-context tables for urns the caller may not see; the key
/// is removed once no table is left.
fn prune_execution_context(payload: &mut Map<String, Value>, allowed: &HashSet<String>) {
    let Some(Value::Object(context)) = payload.get_mut(EXECUTION_CONTEXT_KEY) else {
        return;
    };
    let remaining = match context.get_mut("tables") {
        Some(Value::Array(tables)) => {
            tables.retain(|table| {
                table
                    .get("urn")
                    .and_then(Value::as_str)
                    .is_some_and(|urn| allowed.contains(urn))
            });
            tables.len()
        }
        _ => 0,
    };
    if remaining == 0 {
        payload.remove(EXECUTION_CONTEXT_KEY);
    }
}

#[async_trait]
impl Middleware for AccessControl {
    async fn before(
        &self,
        call: &mut CallContext,
        tool: &mut ToolContext,
    ) -> Result<(), MiddlewareError> {
        let urn = tool
            .canonical_urn()
            .map(str::to_string)
            .or_else(|| input_urn(tool).filter(|urn| is_canonical_urn(urn)));
        let Some(urn) = urn else {
            return Ok(());
        };
        match self.filter.can_access(call, &urn).await {
            Ok(true) => {
                tool.extra
                    .insert(ACCESS_CHECKED_KEY.to_string(), Value::Bool(true));
                Ok(())
            }
            Ok(false) => {
                debug!(tool = %tool.tool_name, urn = %urn, "access denied");
                Err(MiddlewareError::AccessDenied)
            }
            Err(err) => Err(MiddlewareError::failed(format!("access check failed: {err}"))),
        }
    }

    async fn after(
        &self,
        call: &CallContext,
        tool: &ToolContext,
        output: ToolOutput,
    ) -> Result<ToolOutput, MiddlewareError> {
        let Some(shape) = list_shape(&tool.tool_name) else {
            return Ok(output);
        };
        if output.is_error {
            return Ok(output);
        }
        match self.filter_list(call, shape, &output).await {
            Ok(Some(filtered)) => Ok(filtered),
            Ok(None) => Ok(output),
            Err(err) => {
                warn!(
                    tool = %tool.tool_name,
                    error = %err,
                    "access filter failed; returning unfiltered output"
                );
                Ok(output)
            }
        }
    }
}

const fn is_single_entity(name: ToolName) -> bool {
    matches!(
        name,
        ToolName::GetEntity
            | ToolName::GetSchema
            | ToolName::GetGlossaryTerm
            | ToolName::GetDataProduct
    )
}

struct Enrichment {
    enricher: Arc<dyn MetadataEnricher>,
}

#[async_trait]
impl Middleware for Enrichment {
    async fn after(
        &self,
        call: &CallContext,
        tool: &ToolContext,
        output: ToolOutput,
    ) -> Result<ToolOutput, MiddlewareError> {
        let single = ToolName::from_str(&tool.tool_name).is_ok_and(is_single_entity);
        if !single || output.is_error {
            return Ok(output);
        }
        let Some(Value::Object(payload)) = output.payload() else {
            return Ok(output);
        };
        let urn = tool
            .canonical_urn()
            .or_else(|| payload.get("urn").and_then(Value::as_str))
            .map(str::to_string);
        let Some(urn) = urn else {
            return Ok(output);
        };

        match self.enricher.enrich(call, &urn).await {
            Ok(fields) if fields.is_empty() => Ok(output),
            Ok(fields) => Ok(ToolOutput::json_value(merge_top_level(
                Value::Object(payload),
                fields,
            ))),
            Err(err) => {
                debug!(tool = %tool.tool_name, urn = %urn, error = %err, "enrichment skipped");
                Ok(output)
            }
        }
    }
}

/// Bounded hand-off to the audit logger. The worker starts on first use.
struct AuditQueue {
    logger: Arc<dyn AuditLogger>,
    capacity: usize,
    sender: OnceLock<mpsc::Sender<AuditRecord>>,
}

impl AuditQueue {
    fn new(logger: Arc<dyn AuditLogger>, capacity: usize) -> Self {
        Self {
            logger,
            capacity: capacity.max(1),
            sender: OnceLock::new(),
        }
    }

    fn submit(&self, record: AuditRecord) {
        let sender = self.sender.get_or_init(|| self.spawn_worker());
        match sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                warn!(
                    tool = %record.tool_name,
                    audit_id = %record.id,
                    "audit queue full; dropping record"
                );
            }
            Err(TrySendError::Closed(record)) => {
                warn!(
                    tool = %record.tool_name,
                    audit_id = %record.id,
                    "audit worker stopped; dropping record"
                );
            }
        }
    }

    fn spawn_worker(&self) -> mpsc::Sender<AuditRecord> {
        let (sender, mut receiver) = mpsc::channel::<AuditRecord>(self.capacity);
        let logger = Arc::clone(&self.logger);
        tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                let tool = record.tool_name.clone();
                let id = record.id;
                if let Err(err) = logger.log(record).await {
                    warn!(tool = %tool, audit_id = %id, error = %err, "audit logger failed");
                }
            }
        });
        sender
    }
}

struct Audit {
    queue: AuditQueue,
    user_id: UserIdAccessor,
}

/// Top-level input fields; nested values are kept as compact JSON text.
fn shallow_params(input: &Value) -> Map<String, Value> {
    let Some(object) = input.as_object() else {
        return Map::new();
    };
    object
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
                scalar => scalar.clone(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[async_trait]
impl Middleware for Audit {
    async fn after(
        &self,
        call: &CallContext,
        tool: &ToolContext,
        output: ToolOutput,
    ) -> Result<ToolOutput, MiddlewareError> {
        self.queue.submit(AuditRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tool_name: tool.tool_name.clone(),
            params: shallow_params(&tool.input),
            user_id: (self.user_id)(call),
            duration_ms: u64::try_from(tool.elapsed().as_millis()).unwrap_or(u64::MAX),
            success: !output.is_error,
        });
        Ok(output)
    }
}
