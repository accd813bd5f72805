//! Declarative client configuration from YAML, TOML and environment variables.
//!
//! # Supported Formats
//!
//! - **YAML** (requires `config-file` feature): `ClientConfig::from_yaml("bridge.yaml")`
//! - **TOML** (requires `config-file` feature): `ClientConfig::from_toml("bridge.toml")`
//! - **Environment Variables** (always available): `ClientConfig::from_env()`
//!
//! # Example YAML
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 50100
//! connect-timeout-ms: 2000
//! timeout-ms: 10000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ClientConfig, ClientConfigBuilder, ConfigError};

/// File-based client configuration.
///
/// Mirrors [`ClientConfig`] with every field optional; missing fields fall
/// back to the builder defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FileConfig {
    /// Plugin host.
    pub host: Option<String>,
    /// Plugin port.
    pub port: Option<u16>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Read/write timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl TryFrom<FileConfig> for ClientConfig {
    type Error = ConfigError;

    fn try_from(file: FileConfig) -> Result<Self, Self::Error> {
        let mut builder = ClientConfigBuilder::new();

        if let Some(host) = file.host {
            builder = builder.host(host);
        }

        if let Some(port) = file.port {
            builder = builder.port(port);
        }

        if let Some(ms) = file.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }

        if let Some(ms) = file.timeout_ms {
            builder = builder.io_timeout(Duration::from_millis(ms));
        }

        builder.build()
    }
}

impl ClientConfig {
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
    /// | `RENGA_BRIDGE_HOST` | `host` |
    /// | `RENGA_BRIDGE_PORT` | `port` |
    /// | `RENGA_BRIDGE_CONNECT_TIMEOUT_MS` | connect timeout in milliseconds |
    /// | `RENGA_BRIDGE_TIMEOUT_MS` | read/write timeout in milliseconds |
    ///
    /// Unparseable numeric values are rejected rather than ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        file_config_from_env()?.try_into()
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

fn file_config_from_env() -> Result<FileConfig, ConfigError> {
    Ok(FileConfig {
        host: std::env::var("RENGA_BRIDGE_HOST").ok(),
        port: env_number("RENGA_BRIDGE_PORT")?,
        connect_timeout_ms: env_number("RENGA_BRIDGE_CONNECT_TIMEOUT_MS")?,
        timeout_ms: env_number("RENGA_BRIDGE_TIMEOUT_MS")?,
    })
}

/// Loads a configuration file, detecting the format by extension.
///
/// Supports `.yaml`, `.yml` and `.toml`. Requires the `config-file` feature.
#[cfg(feature = "config-file")]
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> Result<ClientConfig, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => ClientConfig::from_yaml(path),
        Some("toml") => ClientConfig::from_toml(path),
        Some(ext) => Err(ConfigError::new(format!(
            "unsupported config file extension: .{ext} (expected .yaml, .yml, or .toml)"
        ))),
        None => Err(ConfigError::new(
            "config file has no extension; expected .yaml, .yml, or .toml",
        )),
    }
}
