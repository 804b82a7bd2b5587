//! Configuration loading and constants.
//!
//! Loads listener and logging settings from a TOML file and defines the
//! defaults used when a setting is omitted. `AppConfig` is the root
//! configuration struct.

use const_format::formatcp;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Default Paths and Strings
// =============================================================================

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "BOOKSHELF_CONFIG";

/// Environment variable that turns on debug logging
pub const DEBUG_ENV_VAR: &str = "BOOKSHELF_DEBUG";

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config/health.toml";

/// Tracing target of this crate
const LOG_TARGET: &str = "bookshelf_health";

/// Default log filter when RUST_LOG is not set
pub const DEFAULT_LOG_FILTER: &str = formatcp!("{}=info", LOG_TARGET);

/// Log filter used in debug mode
pub const DEBUG_LOG_FILTER: &str = formatcp!("{}=debug", LOG_TARGET);

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

// =============================================================================
// Listener Limits
// =============================================================================

/// Time allowed for a client to send its request head, in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;

/// Upper bound on request bytes buffered before responding
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 8192;

/// How long shutdown waits for in-flight sessions, in seconds
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// First pause after a failed accept, in milliseconds (doubles per failure)
pub const ACCEPT_BACKOFF_INITIAL_MS: u64 = 10;

/// Longest pause between accept attempts, in milliseconds
pub const ACCEPT_BACKOFF_MAX_MS: u64 = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Health listener configuration
    pub listener: ListenerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Health listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "ListenerConfig::default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default = "ListenerConfig::default_max_request_bytes")]
    pub max_request_bytes: usize,
    #[serde(default = "ListenerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl ListenerConfig {
    fn default_request_timeout() -> u64 {
        DEFAULT_REQUEST_TIMEOUT_MS
    }

    fn default_max_request_bytes() -> usize {
        DEFAULT_MAX_REQUEST_BYTES
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }

    /// Listener bound to `host:port` with every other setting at its default
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            shutdown_grace_seconds: DEFAULT_SHUTDOWN_GRACE_SECS,
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                ConfigError::Validation(format!("Invalid listener.host or listener.port: {}", e))
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
    /// Verbose logging, also enabled by BOOKSHELF_DEBUG
    #[serde(default)]
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
            debug: false,
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }

    /// Default log filter, taking BOOKSHELF_DEBUG into account
    pub fn default_filter(&self) -> &'static str {
        let env_debug = std::env::var(DEBUG_ENV_VAR)
            .map(|v| parse_truthy(&v))
            .unwrap_or(false);
        if self.debug || env_debug {
            DEBUG_LOG_FILTER
        } else {
            DEFAULT_LOG_FILTER
        }
    }
}

/// Parse a boolean flag the way environment toggles are usually written.
pub fn parse_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.listener.socket_addr()?;

        if self.listener.max_request_bytes == 0 {
            return Err(ConfigError::Validation(
                "listener.max_request_bytes must be greater than zero".to_string(),
            ));
        }

        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "Unknown logging.format '{}', expected \"text\" or \"json\"",
                other
            ))),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
