//! Per-call state shared by handlers and middleware.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Scratch key holding the canonical urn for the call.
pub const CANONICAL_URN_KEY: &str = "canonical_urn";
/// Scratch key set once the access filter allowed the call.
pub const ACCESS_CHECKED_KEY: &str = "access_checked";

/// Protocol-level outcome of a tool call. Everything else is a soft failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ToolCallError {
    #[error("tool call cancelled")]
    Cancelled,
}

pub type ToolFuture = BoxFuture<'static, Result<ToolOutput, ToolCallError>>;

/// Invocable tool body: execution context plus raw JSON input.
pub type ToolHandler = Arc<dyn Fn(CallContext, Value) -> ToolFuture + Send + Sync>;

/// Execution context for a single tool call.
///
/// Before-hooks may attach values; the handler receives the context after
/// every before-hook ran.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub cancel: CancellationToken,
    caller: Option<String>,
    values: HashMap<String, Value>,
}

impl CallContext {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            caller: None,
            values: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        let caller = caller.into();
        self.caller = (!caller.trim().is_empty()).then_some(caller);
        self
    }

    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Canonical urn published by the urn resolver, if any.
    #[must_use]
    pub fn canonical_urn(&self) -> Option<&str> {
        self.get(CANONICAL_URN_KEY).and_then(Value::as_str)
    }
}

/// Record created fresh for every call and dropped after the last after-hook.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub tool_name: String,
    pub input: Value,
    pub started_at: Instant,
    pub extra: HashMap<String, Value>,
}

impl ToolContext {
    #[must_use]
    pub fn new(tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
            started_at: Instant::now(),
            extra: HashMap::new(),
        }
    }

    /// String field of the raw input object.
    #[must_use]
    pub fn input_str(&self, field: &str) -> Option<&str> {
        self.input.get(field).and_then(Value::as_str)
    }

    #[must_use]
    pub fn canonical_urn(&self) -> Option<&str> {
        self.extra.get(CANONICAL_URN_KEY).and_then(Value::as_str)
    }

    #[must_use]
    pub fn access_checked(&self) -> bool {
        self.extra
            .get(ACCESS_CHECKED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Result of a tool call as seen by middleware and the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub structured: Option<Value>,
    pub is_error: bool,
}

impl ToolOutput {
    /// Plain text success.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structured: None,
            is_error: false,
        }
    }

    /// Soft failure carrying a message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            structured: None,
            is_error: true,
        }
    }

    /// JSON success. Objects are also exposed as structured content.
    #[must_use]
    pub fn json_value(value: Value) -> Self {
        let text = value.to_string();
        Self {
            text,
            structured: value.is_object().then_some(value),
            is_error: false,
        }
    }

    /// Serializes `value` as a JSON success, or a soft failure if it cannot be.
    #[must_use]
    pub fn json<T: Serialize>(value: &T) -> Self {
        serde_json::to_value(value).map_or_else(
            |err| Self::error(format!("failed to serialize tool output: {err}")),
            Self::json_value,
        )
    }

    /// Parsed JSON payload, preferring structured content over the text.
    #[must_use]
    pub fn payload(&self) -> Option<Value> {
        if let Some(value) = &self.structured {
            return Some(value.clone());
        }
        if self.text.trim().is_empty() {
            return None;
        }
        serde_json::from_str(&self.text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_caller_is_absent() {
        let call = CallContext::default().with_caller("  ");
        assert_eq!(call.caller(), None);
        let call = CallContext::default().with_caller("alice");
        assert_eq!(call.caller(), Some("alice"));
    }

    #[test]
    fn json_output_carries_structured_objects_only() {
        let output = ToolOutput::json(&json!({"urn": "u1"}));
        assert_eq!(output.text, r#"{"urn":"u1"}"#);
        assert_eq!(output.structured, Some(json!({"urn": "u1"})));

        let output = ToolOutput::json(&json!(["a"]));
        assert!(output.structured.is_none());
        assert_eq!(output.payload(), Some(json!(["a"])));
    }

    #[test]
    fn payload_of_plain_text_is_none() {
        assert_eq!(ToolOutput::text("ok").payload(), None);
        assert_eq!(ToolOutput::text("").payload(), None);
    }

    #[test]
    fn scratch_flags_default_off() {
        let mut tool = ToolContext::new("catalog_get_entity", json!({"urn": "x"}));
        assert!(!tool.access_checked());
        assert_eq!(tool.input_str("urn"), Some("x"));
        tool.extra.insert(ACCESS_CHECKED_KEY.to_string(), Value::Bool(true));
        assert!(tool.access_checked());
    }
}
