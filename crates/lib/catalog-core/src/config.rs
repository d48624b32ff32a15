use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::services::ConnectionError;

pub const DEFAULT_CONNECTION_NAME: &str = "default";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY_MAX: u32 = 3;
pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_MAX_LIMIT: usize = 100;

/// Fully materialized settings for one catalog connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub url: String,
    pub token: String,
    pub timeout: Duration,
    pub retry_max: u32,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            retry_max: DEFAULT_RETRY_MAX,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_retry_max(mut self, retry_max: u32) -> Self {
        self.retry_max = retry_max;
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    /// Applies the paging policy: missing or zero falls back to the default,
    /// anything above the maximum is clamped.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        let limit = requested
            .filter(|value| *value > 0)
            .unwrap_or(self.default_limit);
        if self.max_limit > 0 {
            limit.min(self.max_limit)
        } else {
            limit
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("timeout", &self.timeout)
            .field("retry_max", &self.retry_max)
            .field("default_limit", &self.default_limit)
            .field("max_limit", &self.max_limit)
            .finish()
    }
}

/// Partial settings for a named connection. Unset or zero fields inherit from
/// the primary connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<usize>,
}

impl ConnectionOverride {
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    #[must_use]
    pub const fn with_retry_max(mut self, retry_max: u32) -> Self {
        self.retry_max = Some(retry_max);
        self
    }

    #[must_use]
    pub const fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = Some(default_limit);
        self.max_limit = Some(max_limit);
        self
    }

    /// Resolves this override against `primary`, field by field.
    #[must_use]
    pub fn apply(&self, primary: &ClientConfig) -> ClientConfig {
        let mut config = primary.clone();
        if let Some(url) = self.url.as_deref().filter(|value| !value.is_empty()) {
            config.url = url.to_string();
        }
        if let Some(token) = self.token.as_deref().filter(|value| !value.is_empty()) {
            config.token = token.to_string();
        }
        if let Some(secs) = self.timeout_secs.filter(|value| *value > 0) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retry_max) = self.retry_max.filter(|value| *value > 0) {
            config.retry_max = retry_max;
        }
        if let Some(default_limit) = self.default_limit.filter(|value| *value > 0) {
            config.default_limit = default_limit;
        }
        if let Some(max_limit) = self.max_limit.filter(|value| *value > 0) {
            config.max_limit = max_limit;
        }
        config
    }
}

/// Primary connection plus named overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionsConfig {
    pub default_name: String,
    pub primary: ClientConfig,
    pub overrides: BTreeMap<String, ConnectionOverride>,
}

impl ConnectionsConfig {
    #[must_use]
    pub fn new(primary: ClientConfig) -> Self {
        Self {
            default_name: DEFAULT_CONNECTION_NAME.to_string(),
            primary,
            overrides: BTreeMap::new(),
        }
    }

    /// Sets the display name of the primary connection. Blank names keep the default.
    #[must_use]
    pub fn with_default_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.trim();
        if !name.is_empty() {
            self.default_name = name.to_string();
        }
        self
    }

    #[must_use]
    pub fn with_override(mut self, name: impl Into<String>, value: ConnectionOverride) -> Self {
        self.overrides.insert(name.into(), value);
        self
    }

    /// Replaces the override map after validating its names.
    ///
    /// # Errors
    /// Returns `ConnectionError::InvalidConnections` for blank connection names.
    pub fn with_overrides(
        mut self,
        overrides: BTreeMap<String, ConnectionOverride>,
    ) -> Result<Self, ConnectionError> {
        for name in overrides.keys() {
            if name.trim().is_empty() {
                return Err(ConnectionError::InvalidConnections(
                    "connection names must not be blank".to_string(),
                ));
            }
        }
        self.overrides = overrides;
        Ok(self)
    }

    pub(crate) fn is_default(&self, name: &str) -> bool {
        name.is_empty() || name == self.default_name
    }

    pub(crate) fn cache_key<'a>(&'a self, name: &'a str) -> &'a str {
        if name.is_empty() {
            self.default_name.as_str()
        } else {
            name
        }
    }

    /// Override names excluding any entry that shadows the default name.
    pub(crate) fn override_names(&self) -> impl Iterator<Item = &str> {
        self.overrides
            .keys()
            .map(String::as_str)
            .filter(|name| *name != self.default_name)
    }
}

/// Parses the additional-connections JSON object (`{"name": {..override..}}`).
///
/// Blank input yields an empty map.
///
/// # Errors
/// Returns `ConnectionError::InvalidConnections` when the payload is not an
/// object of override records.
pub fn parse_connections_json(
    raw: &str,
) -> Result<BTreeMap<String, ConnectionOverride>, ConnectionError> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let overrides: BTreeMap<String, ConnectionOverride> = serde_json::from_str(raw)
        .map_err(|err| ConnectionError::InvalidConnections(err.to_string()))?;
    if overrides.keys().any(|name| name.trim().is_empty()) {
        return Err(ConnectionError::InvalidConnections(
            "connection names must not be blank".to_string(),
        ));
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> ClientConfig {
        ClientConfig::new("https://primary", "primary-token")
            .with_timeout(Duration::from_secs(30))
            .with_retry_max(3)
            .with_limits(10, 100)
    }

    #[test]
    fn empty_override_inherits_everything() {
        let resolved = ConnectionOverride::default().apply(&primary());
        assert_eq!(resolved, primary());
    }

    #[test]
    fn zero_values_inherit() {
        let value = ConnectionOverride {
            url: Some(String::new()),
            token: Some(String::new()),
            timeout_secs: Some(0),
            retry_max: Some(0),
            default_limit: Some(0),
            max_limit: Some(0),
        };
        assert_eq!(value.apply(&primary()), primary());
    }

    #[test]
    fn each_field_overrides_independently() {
        let base = primary();

        let resolved = ConnectionOverride::default().with_url("https://s").apply(&base);
        assert_eq!(resolved.url, "https://s");
        assert_eq!(resolved.token, base.token);

        let resolved = ConnectionOverride::default().with_token("t2").apply(&base);
        assert_eq!(resolved.token, "t2");
        assert_eq!(resolved.url, base.url);

        let resolved = ConnectionOverride::default().with_timeout_secs(5).apply(&base);
        assert_eq!(resolved.timeout, Duration::from_secs(5));
        assert_eq!(resolved.retry_max, base.retry_max);

        let resolved = ConnectionOverride::default().with_retry_max(7).apply(&base);
        assert_eq!(resolved.retry_max, 7);
        assert_eq!(resolved.timeout, base.timeout);

        let resolved = ConnectionOverride {
            default_limit: Some(25),
            ..ConnectionOverride::default()
        }
        .apply(&base);
        assert_eq!(resolved.default_limit, 25);
        assert_eq!(resolved.max_limit, base.max_limit);

        let resolved = ConnectionOverride {
            max_limit: Some(500),
            ..ConnectionOverride::default()
        }
        .apply(&base);
        assert_eq!(resolved.max_limit, 500);
        assert_eq!(resolved.default_limit, base.default_limit);
    }

    #[test]
    fn effective_limit_defaults_and_clamps() {
        let config = primary();
        assert_eq!(config.effective_limit(None), 10);
        assert_eq!(config.effective_limit(Some(0)), 10);
        assert_eq!(config.effective_limit(Some(42)), 42);
        assert_eq!(config.effective_limit(Some(1_000)), 100);
    }

    #[test]
    fn parses_connections_json() {
        let parsed = parse_connections_json(
            r#"{"staging": {"url": "https://s"}, "prod": {"token": "p", "timeout_secs": 10}}"#,
        )
        .expect("valid json");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["staging"].url.as_deref(), Some("https://s"));
        assert_eq!(parsed["prod"].timeout_secs, Some(10));
    }

    #[test]
    fn blank_connections_json_is_empty() {
        assert!(parse_connections_json("  ").expect("blank is ok").is_empty());
    }

    #[test]
    fn rejects_malformed_connections_json() {
        assert!(matches!(
            parse_connections_json("[1, 2]"),
            Err(ConnectionError::InvalidConnections(_))
        ));
        assert!(matches!(
            parse_connections_json(r#"{"staging": {"uri": "typo"}}"#),
            Err(ConnectionError::InvalidConnections(_))
        ));
        assert!(matches!(
            parse_connections_json(r#"{" ": {"url": "https://x"}}"#),
            Err(ConnectionError::InvalidConnections(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", primary());
        assert!(!rendered.contains("primary-token"));
    }
}
