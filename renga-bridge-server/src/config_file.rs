//! Declarative server configuration from YAML, TOML and environment variables.
//!
//! # Example TOML
//!
//! ```toml
//! bind-host = "127.0.0.1"
//! port = 50100
//! read-timeout-ms = 10000
//! write-timeout-ms = 10000
//! default-column-height = 3000.0
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ServerConfig, ServerConfigBuilder};

/// File-based server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileConfig {
    /// Bind host.
    pub bind_host: Option<String>,
    /// Listening port.
    pub port: Option<u16>,
    /// Request read timeout in milliseconds.
    pub read_timeout_ms: Option<u64>,
    /// Response write timeout in milliseconds.
    pub write_timeout_ms: Option<u64>,
    /// Column height used when a point has none.
    pub default_column_height: Option<f64>,
}

impl TryFrom<FileConfig> for ServerConfig {
    type Error = ConfigError;

    fn try_from(file: FileConfig) -> Result<Self, Self::Error> {
        let mut builder = ServerConfigBuilder::new();

        if let Some(host) = file.bind_host {
            builder = builder.bind_host(host);
        }
        if let Some(port) = file.port {
            builder = builder.port(port);
        }
        if let Some(ms) = file.read_timeout_ms {
            builder = builder.read_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.write_timeout_ms {
            builder = builder.write_timeout(Duration::from_millis(ms));
        }
        if let Some(height) = file.default_column_height {
            builder = builder.default_column_height(height);
        }

        builder.build()
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file.
    ///
    /// Requires the `config-file` feature.
    #[cfg(feature = "config-file")]
    pub fn from_yaml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("failed to read YAML config file: {e}")))?;
        let file_config: FileConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("failed to parse YAML config: {e}")))?;
        file_config.try_into()
    }

    /// Loads configuration from a TOML file.
    ///
    /// Requires the `config-file` feature.
    #[cfg(feature = "config-file")]
    pub fn from_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("failed to read TOML config file: {e}")))?;
        let file_config: FileConfig = toml_crate::from_str(&content)
            .map_err(|e| ConfigError::new(format!("failed to parse TOML config: {e}")))?;
        file_config.try_into()
    }

    /// Loads configuration from environment variables.
    ///
    /// | Variable | Maps to |
    /// |----------|---------|
    /// | `RENGA_BRIDGE_BIND_HOST` | `bind_host` |
    /// | `RENGA_BRIDGE_PORT` | `port` |
    /// | `RENGA_BRIDGE_READ_TIMEOUT_MS` | read timeout in milliseconds |
    /// | `RENGA_BRIDGE_WRITE_TIMEOUT_MS` | write timeout in milliseconds |
    /// | `RENGA_BRIDGE_DEFAULT_HEIGHT` | default column height |
    pub fn from_env() -> Result<Self, ConfigError> {
        FileConfig {
            bind_host: std::env::var("RENGA_BRIDGE_BIND_HOST").ok(),
            port: env_number("RENGA_BRIDGE_PORT")?,
            read_timeout_ms: env_number("RENGA_BRIDGE_READ_TIMEOUT_MS")?,
            write_timeout_ms: env_number("RENGA_BRIDGE_WRITE_TIMEOUT_MS")?,
            default_column_height: env_number("RENGA_BRIDGE_DEFAULT_HEIGHT")?,
        }
        .try_into()
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::new(format!("{name} must be a number, got \"{val}\""))),
        Err(_) => Ok(None),
    }
}

/// Loads a configuration file, detecting the format by extension.
///
/// Supports `.yaml`, `.yml` and `.toml`. Requires the `config-file` feature.
#[cfg(feature = "config-file")]
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<ServerConfig, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => ServerConfig::from_yaml(path),
        Some("toml") => ServerConfig::from_toml(path),
        Some(ext) => Err(ConfigError::new(format!(
            "unsupported config file extension: .{ext} (expected .yaml, .yml, or .toml)"
        ))),
        None => Err(ConfigError::new(
            "config file has no extension; expected .yaml, .yml, or .toml",
        )),
    }
}
