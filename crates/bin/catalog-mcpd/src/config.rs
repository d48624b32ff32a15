use std::net::SocketAddr;
use std::time::Duration;

use catalog_core::config::{
    ClientConfig,
    ConnectionsConfig,
    DEFAULT_CONNECTION_NAME,
    DEFAULT_LIMIT,
    DEFAULT_MAX_LIMIT,
    DEFAULT_RETRY_MAX,
    parse_connections_json,
};
use catalog_core::services::ConnectionError;
use clap::{Parser, ValueEnum, builder::BoolishValueParser};
use thiserror::Error;

const DEFAULT_MCP_HTTP_ADDR: &str = "127.0.0.1:4020";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "catalog-mcpd", version, about = "Catalog MCP daemon.")]
struct CliArgs {
    /// Base URL of the primary catalog.
    #[arg(long, env = "CATALOG_URL", default_value = "")]
    url: String,

    #[arg(long, env = "CATALOG_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(long, env = "CATALOG_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, env = "CATALOG_RETRY_MAX", default_value_t = DEFAULT_RETRY_MAX)]
    retry_max: u32,

    #[arg(long, env = "CATALOG_DEFAULT_LIMIT", default_value_t = DEFAULT_LIMIT)]
    default_limit: usize,

    #[arg(long, env = "CATALOG_MAX_LIMIT", default_value_t = DEFAULT_MAX_LIMIT)]
    max_limit: usize,

    /// Name under which the primary catalog is addressed.
    #[arg(long, env = "CATALOG_CONNECTION_NAME", default_value = DEFAULT_CONNECTION_NAME)]
    connection_name: String,

    /// JSON object of additional named connections.
    #[arg(long, env = "CATALOG_CONNECTIONS", hide_env_values = true)]
    connections: Option<String>,

    #[arg(
        long,
        env = "CATALOG_WRITE_ENABLED",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    write_enabled: bool,

    #[arg(
        long = "stdio",
        env = "CATALOG_ENABLE_STDIO",
        default_value_t = false,
        value_parser = BoolishValueParser::new()
    )]
    enable_stdio: bool,

    #[arg(long, env = "CATALOG_MCP_HTTP_ADDR", default_value = DEFAULT_MCP_HTTP_ADDR)]
    mcp_http_addr: SocketAddr,

    #[arg(long, env = "CATALOG_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

/// Runtime configuration loaded from CLI arguments and environment variables.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub connections: ConnectionsConfig,
    pub write_enabled: bool,
    pub enable_stdio: bool,
    pub mcp_http_addr: SocketAddr,
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid {name} value: {value}")]
    InvalidSetting { name: &'static str, value: String },
    #[error(transparent)]
    Connections(#[from] ConnectionError),
}

impl CatalogConfig {
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::try_from(CliArgs::parse())
    }
}

impl TryFrom<CliArgs> for CatalogConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let url = args.url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingSetting("CATALOG_URL"));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidSetting {
                name: "CATALOG_URL",
                value: args.url,
            });
        }
        if args.timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "CATALOG_TIMEOUT_SECS",
                value: args.timeout_secs.to_string(),
            });
        }
        if args.default_limit == 0 || args.default_limit > args.max_limit {
            return Err(ConfigError::InvalidSetting {
                name: "CATALOG_DEFAULT_LIMIT",
                value: format!("{} (max {})", args.default_limit, args.max_limit),
            });
        }
        if args.connection_name.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "CATALOG_CONNECTION_NAME",
                value: args.connection_name,
            });
        }

        let primary = ClientConfig::new(url, args.token.unwrap_or_default().trim())
            .with_timeout(Duration::from_secs(args.timeout_secs))
            .with_retry_max(args.retry_max)
            .with_limits(args.default_limit, args.max_limit);
        let overrides = parse_connections_json(args.connections.as_deref().unwrap_or_default())?;
        let connections = ConnectionsConfig::new(primary)
            .with_default_name(args.connection_name)
            .with_overrides(overrides)?;

        Ok(Self {
            connections,
            write_enabled: args.write_enabled,
            enable_stdio: args.enable_stdio,
            mcp_http_addr: args.mcp_http_addr,
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            url: "https://catalog.example".to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry_max: DEFAULT_RETRY_MAX,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
            connection_name: DEFAULT_CONNECTION_NAME.to_string(),
            connections: None,
            write_enabled: false,
            enable_stdio: false,
            mcp_http_addr: DEFAULT_MCP_HTTP_ADDR.parse().expect("valid MCP addr"),
            log_format: LogFormat::Text,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }

    #[test]
    fn url_is_required() {
        let mut args = base_args();
        args.url = "  ".to_string();
        assert!(matches!(
            CatalogConfig::try_from(args),
            Err(ConfigError::MissingSetting("CATALOG_URL"))
        ));
    }

    #[test]
    fn default_limit_must_fit_under_max() {
        let mut args = base_args();
        args.default_limit = 500;
        assert!(matches!(
            CatalogConfig::try_from(args),
            Err(ConfigError::InvalidSetting {
                name: "CATALOG_DEFAULT_LIMIT",
                ..
            })
        ));
    }

    #[test]
    fn additional_connections_inherit_from_primary() {
        let mut args = base_args();
        args.token = Some("secret".to_string());
        args.connection_name = "prod".to_string();
        args.connections = Some(r#"{"staging": {"url": "https://staging.example"}}"#.to_string());

        let config = CatalogConfig::try_from(args).expect("config should parse");
        assert_eq!(config.connections.default_name, "prod");
        let staging = config.connections.overrides["staging"].apply(&config.connections.primary);
        assert_eq!(staging.url, "https://staging.example");
        assert_eq!(staging.token, "secret");
    }

    #[test]
    fn malformed_connections_are_rejected() {
        let mut args = base_args();
        args.connections = Some("[1, 2]".to_string());
        assert!(matches!(
            CatalogConfig::try_from(args),
            Err(ConfigError::Connections(ConnectionError::InvalidConnections(_)))
        ));
    }
}
