//! Tool host contract: what a protocol binding receives at registration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ToolHandler;

pub type JsonObject = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolIcon {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Vec<String>>,
}

impl ToolIcon {
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            mime_type: None,
            sizes: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Behavioral hints published with a tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent_hint: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world_hint: Option<bool>,
}

impl ToolAnnotations {
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(true),
        }
    }

    #[must_use]
    pub const fn write(destructive: bool, idempotent: bool) -> Self {
        Self {
            read_only_hint: Some(false),
            destructive_hint: Some(destructive),
            idempotent_hint: Some(idempotent),
            open_world_hint: Some(true),
        }
    }
}

/// Everything a host publishes for one tool. Absent facets are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<ToolIcon>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
    pub input_schema: JsonObject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<JsonObject>,
}

/// Receives tool registrations from a toolkit.
pub trait ToolHost {
    fn add_tool(&mut self, definition: ToolDefinition, handler: ToolHandler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_uses_wire_field_names() {
        let definition = ToolDefinition {
            name: "catalog_ping".to_string(),
            title: Some("Ping".to_string()),
            description: None,
            icons: Some(vec![
                ToolIcon::new("https://icons.example/ping.svg").with_mime_type("image/svg+xml"),
            ]),
            annotations: Some(ToolAnnotations::read_only()),
            input_schema: json!({"type": "object"}).as_object().cloned().unwrap_or_default(),
            output_schema: None,
        };
        let wire = serde_json::to_value(&definition).expect("serializes");
        assert_eq!(wire["inputSchema"]["type"], "object");
        assert_eq!(wire["annotations"]["readOnlyHint"], true);
        assert_eq!(wire["icons"][0]["mimeType"], "image/svg+xml");
        assert!(wire.get("description").is_none());
        assert!(wire.get("outputSchema").is_none());
    }
}
