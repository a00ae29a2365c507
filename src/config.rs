//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiConfig;
use crate::websocket::{HubConfig, PumpConfig, WsSettings};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub websocket: WebSocketConfig,

    #[serde(default)]
    pub hub: HubSection,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_size() -> usize {
    1024 * 1024 // 1 MB
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Per-connection WebSocket configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    /// Largest inbound frame accepted (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Time allowed between pongs; pings go out every 9/10 of it
    #[serde(default = "default_pong_wait")]
    pub pong_wait_secs: u64,

    #[serde(default = "default_write_wait")]
    pub write_wait_secs: u64,

    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,

    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

fn default_max_message_size() -> usize {
    512
}

fn default_pong_wait() -> u64 {
    60
}

fn default_write_wait() -> u64 {
    10
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_identity_header() -> String {
    "JwtUID".to_string()
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            pong_wait_secs: default_pong_wait(),
            write_wait_secs: default_write_wait(),
            outbound_capacity: default_outbound_capacity(),
            identity_header: default_identity_header(),
        }
    }
}

/// Hub configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HubSection {
    #[serde(default = "default_request_capacity")]
    pub request_capacity: usize,

    #[serde(default = "default_private_topics")]
    pub private_topics: Vec<String>,
}

fn default_request_capacity() -> usize {
    256
}

fn default_private_topics() -> Vec<String> {
    HubConfig::default().private_topics
}

impl Default for HubSection {
    fn default() -> Self {
        Self {
            request_capacity: default_request_capacity(),
            private_topics: default_private_topics(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    ///
    /// Nothing is logged here since this runs before the subscriber is
    /// installed. Call [`LoadedConfig::log`] once logging is up.
    pub fn load_default() -> LoadedConfig {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("wsgate").join("config.toml")),
            Some(PathBuf::from("/etc/wsgate/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file that parses, falling back to environment
    pub fn load_first(paths: &[PathBuf]) -> LoadedConfig {
        let mut failures = Vec::new();

        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_with_env(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: ConfigSource::File(path.clone()),
                        failures,
                    }
                }
                Err(e) => failures.push(e),
            }
        }

        LoadedConfig {
            config: Self::from_env(),
            source: ConfigSource::Environment,
            failures,
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("WSGATE_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("WSGATE_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(header) = std::env::var("WSGATE_IDENTITY_HEADER") {
            self.websocket.identity_header = header;
        }

        if let Ok(level) = std::env::var("WSGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WSGATE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            max_body_size: self.server.max_body_size,
        }
    }

    pub fn ws_settings(&self) -> WsSettings {
        let ws = &self.websocket;
        WsSettings {
            pump: PumpConfig::new(
                ws.max_message_size,
                Duration::from_secs(ws.pong_wait_secs),
                Duration::from_secs(ws.write_wait_secs),
            ),
            outbound_capacity: ws.outbound_capacity,
            identity_header: ws.identity_header.clone(),
        }
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            request_capacity: self.hub.request_capacity,
            private_topics: self.hub.private_topics.clone(),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Defaults with `WSGATE_*` overrides
    Environment,
}

/// Result of searching the default locations
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub source: ConfigSource,
    /// Candidate files that existed but could not be loaded
    pub failures: Vec<ConfigError>,
}

impl LoadedConfig {
    pub fn from_file(config: Config, path: PathBuf) -> Self {
        Self {
            config,
            source: ConfigSource::File(path),
            failures: Vec::new(),
        }
    }

    /// Report how the configuration was found
    pub fn log(&self) {
        for failure in &self.failures {
            tracing::warn!("Skipping config: {}", failure);
        }
        match &self.source {
            ConfigSource::File(path) => tracing::info!("Loaded config from {:?}", path),
            ConfigSource::Environment => {
                tracing::info!("Using default config with environment overrides")
            }
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# wsgate Configuration
#
# Environment variables override these settings:
# - WSGATE_HOST
# - WSGATE_PORT
# - WSGATE_IDENTITY_HEADER
# - WSGATE_LOG_LEVEL
# - WSGATE_LOG_FORMAT

[server]
host = "0.0.0.0"
port = 8080

# Body limit for POST /api/v1/publish (bytes)
max_body_size = 1048576

[websocket]
# Largest inbound frame (bytes)
max_message_size = 512

# Seconds allowed between pongs; pings are sent every 9/10 of this
pong_wait_secs = 60

# Seconds allowed for a single write
write_wait_secs = 10

# Outbound queue capacity per connection
outbound_capacity = 256

# Header carrying the authenticated identity
identity_header = "JwtUID"

[hub]
request_capacity = 256

# Topics delivered per identity; only authenticated connections may subscribe
private_topics = ["order", "trade", "balance"]

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
