//! Configuration module for gamehub.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{GamehubError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Environment name reported by the healthcheck (development, staging, production).
    #[serde(default = "default_env")]
    pub env: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_env() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            env: default_env(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound for a single storage operation, in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
}

fn default_db_path() -> String {
    "data/gamehub.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

fn default_operation_timeout() -> u64 {
    3
}

impl DatabaseConfig {
    /// Operation timeout as a `Duration`.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
            operation_timeout_secs: default_operation_timeout(),
        }
    }
}

/// Token lifetimes and registration defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of authentication (bearer) tokens in hours.
    #[serde(default = "default_authentication_ttl")]
    pub authentication_token_ttl_hours: i64,
    /// Lifetime of activation tokens in hours.
    #[serde(default = "default_activation_ttl")]
    pub activation_token_ttl_hours: i64,
    /// Permission codes granted to every newly registered user.
    #[serde(default = "default_permissions")]
    pub default_permissions: Vec<String>,
}

fn default_authentication_ttl() -> i64 {
    24
}

fn default_activation_ttl() -> i64 {
    72
}

fn default_permissions() -> Vec<String> {
    vec!["games:read".to_string()]
}

impl AuthConfig {
    /// Authentication token lifetime.
    pub fn authentication_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.authentication_token_ttl_hours)
    }

    /// Activation token lifetime.
    pub fn activation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.activation_token_ttl_hours)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            authentication_token_ttl_hours: default_authentication_ttl(),
            activation_token_ttl_hours: default_activation_ttl(),
            default_permissions: default_permissions(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives: a level (trace, debug, info, warn, error) or an
    /// `EnvFilter` string such as `warn,gamehub=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional file that receives a copy of every log line.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Token and registration configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GamehubError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GamehubError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GAMEHUB_DATABASE_PATH`: database file path
    /// - `GAMEHUB_PORT`: HTTP port
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("GAMEHUB_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(port) = std::env::var("GAMEHUB_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid GAMEHUB_PORT value: {}", port),
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.is_empty() {
            return Err(GamehubError::Config("database.path must not be empty".into()));
        }
        if self.database.operation_timeout_secs == 0 {
            return Err(GamehubError::Config(
                "database.operation_timeout_secs must be positive".into(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(GamehubError::Config(
                "database.max_connections must be positive".into(),
            ));
        }
        if self.auth.authentication_token_ttl_hours <= 0
            || self.auth.activation_token_ttl_hours <= 0
        {
            return Err(GamehubError::Config("token lifetimes must be positive".into()));
        }
        Ok(())
    }
}
