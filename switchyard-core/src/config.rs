// Engine configuration

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix shared by every environment variable read by [`EngineConfig::from_env`].
pub const ENV_PREFIX: &str = "SWITCHYARD_";

/// Runtime configuration for an [`Engine`](crate::Engine).
///
/// `addr` and the timeouts are handed to whatever host runtime serves the
/// engine; the engine itself only enforces `max_body_size`,
/// `handle_method_not_allowed` and the request id header name.
///
/// ```
/// use switchyard_core::EngineConfig;
///
/// let config = EngineConfig::from_toml_str(r#"
///     addr = "127.0.0.1:3000"
///     max_body_size = 1024
/// "#).unwrap();
///
/// assert_eq!(config.addr, "127.0.0.1:3000");
/// assert_eq!(config.max_body_size, 1024);
/// assert!(config.handle_method_not_allowed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub addr: String,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Requests with a larger body are answered 413 without running the chain.
    pub max_body_size: usize,
    /// When false a method miss is reported as 404 instead of 405.
    pub handle_method_not_allowed: bool,
    pub request_id_header: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
            read_timeout_secs: 10,
            write_timeout_secs: 10,
            max_body_size: 4 * 1024 * 1024,
            handle_method_not_allowed: true,
            request_id_header: "x-request-id".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Defaults overridden by `SWITCHYARD_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `SWITCHYARD_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = var("ADDR") {
            config.addr = value;
        }
        if let Some((key, value)) = var("READ_TIMEOUT_SECS") {
            config.read_timeout_secs = parse_env(key, value)?;
        }
        if let Some((key, value)) = var("WRITE_TIMEOUT_SECS") {
            config.write_timeout_secs = parse_env(key, value)?;
        }
        if let Some((key, value)) = var("MAX_BODY_SIZE") {
            config.max_body_size = parse_env(key, value)?;
        }
        if let Some((key, value)) = var("HANDLE_METHOD_NOT_ALLOWED") {
            config.handle_method_not_allowed = parse_bool(key, value)?;
        }
        if let Some((_, value)) = var("REQUEST_ID_HEADER") {
            config.request_id_header = value;
        }

        Ok(config)
    }

    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_handle_method_not_allowed(mut self, enabled: bool) -> Self {
        self.handle_method_not_allowed = enabled;
        self
    }

    pub fn with_request_id_header(mut self, header: impl Into<String>) -> Self {
        self.request_id_header = header.into();
        self
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(key: String, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}

fn parse_bool(key: String, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env { key, value }),
    }
}
