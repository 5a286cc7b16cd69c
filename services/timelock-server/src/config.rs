//! Server Configuration
//!
//! Sources, lowest precedence first: built-in defaults, `config/default`,
//! `config/local`, an optional `--config` file, `TIMELOCK__*` environment
//! variables, then CLI flags (applied in `main`).

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use timelock_api::ApiConfig;
use timelock_gateway::GatewayConfig;
use timelock_types::{DEFAULT_GRACE_PERIOD_SECS, DEFAULT_NETWORK_URL};

/// Server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    /// Ledger endpoint and escrow parties
    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server binding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on closing the ledger connection at shutdown
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// WebSocket URL of the ledger node, or `local-sim`
    #[serde(default = "default_network_url")]
    pub network_url: String,

    #[serde(default)]
    pub buyer_address: String,

    #[serde(default)]
    pub buyer_seed: String,

    #[serde(default)]
    pub seller_address: String,

    #[serde(default)]
    pub seller_seed: String,

    /// Seconds after creation before an escrow may be finished
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: i64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound on waiting for a submitted transaction to validate
    #[serde(default = "default_submit_timeout")]
    pub submit_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Ledgers of headroom given to `LastLedgerSequence`
    #[serde(default = "default_ledger_offset")]
    pub ledger_offset: u32,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            network_url: default_network_url(),
            buyer_address: String::new(),
            buyer_seed: String::new(),
            seller_address: String::new(),
            seller_seed: String::new(),
            grace_period_secs: default_grace_period(),
            request_timeout_secs: default_request_timeout(),
            submit_timeout_secs: default_submit_timeout(),
            poll_interval_ms: default_poll_interval(),
            ledger_offset: default_ledger_offset(),
        }
    }
}

impl LedgerSettings {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            ledger_offset: self.ledger_offset,
        }
    }
}

/// API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_true")]
    pub enable_compression: bool,

    #[serde(default = "default_true")]
    pub enable_tracing: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            enable_cors: true,
            cors_origins: default_cors_origins(),
            enable_compression: true,
            enable_tracing: true,
        }
    }
}

impl From<&ApiSettings> for ApiConfig {
    fn from(settings: &ApiSettings) -> Self {
        ApiConfig {
            enable_cors: settings.enable_cors,
            cors_origins: settings.cors_origins.clone(),
            enable_compression: settings.enable_compression,
            enable_tracing: settings.enable_tracing,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus scrape port (separate from the API)
    #[serde(default = "default_metrics_port")]
    pub port: Option<u16>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

// =============================================================================
// Default Functions
// =============================================================================

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_network_url() -> String {
    DEFAULT_NETWORK_URL.to_string()
}

fn default_grace_period() -> i64 {
    DEFAULT_GRACE_PERIOD_SECS
}

fn default_request_timeout() -> u64 {
    10
}

fn default_submit_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_ledger_offset() -> u32 {
    20
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_metrics_port() -> Option<u16> {
    Some(9090)
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl ServerConfig {
    /// Load configuration from files and `TIMELOCK__` environment variables
    pub fn load(config_path: Option<&str>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false));

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("TIMELOCK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("api.cors_origins"),
        );

        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.ledger.network_url, DEFAULT_NETWORK_URL);
        assert_eq!(config.ledger.grace_period_secs, 10);
        assert!(!config.metrics.enabled);
        assert_eq!(
            config.server.socket_addr().unwrap(),
            "0.0.0.0:3001".parse().unwrap()
        );
    }

    #[test]
    fn test_gateway_config() {
        let ledger = LedgerSettings {
            submit_timeout_secs: 30,
            poll_interval_ms: 250,
            ..LedgerSettings::default()
        };
        let gateway = ledger.gateway_config();
        assert_eq!(gateway.submit_timeout, Duration::from_secs(30));
        assert_eq!(gateway.poll_interval, Duration::from_millis(250));
        assert_eq!(gateway.ledger_offset, 20);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ServerConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[ledger]\nnetwork_url = \"local-sim\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.ledger.network_url, "local-sim");
        assert_eq!(config.ledger.submit_timeout_secs, 60);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
    }

    #[test]
    fn test_invalid_host() {
        let settings = ServerSettings {
            host: "not a host".into(),
            ..ServerSettings::default()
        };
        assert!(settings.socket_addr().is_err());
    }
}
