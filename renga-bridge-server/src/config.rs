//! Server configuration types and builders.

use std::time::Duration;

use renga_bridge_core::config::validate_port;
use renga_bridge_core::protocol::{DEFAULT_COLUMN_HEIGHT, DEFAULT_PORT, DEFAULT_TIMEOUT};

pub use renga_bridge_core::config::ConfigError;

/// Default bind host.
pub const DEFAULT_BIND_HOST: &str = "127.0.0.1";

/// Listener and request-handling settings for a [`BridgeServer`](crate::BridgeServer).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    bind_host: String,
    port: u16,
    read_timeout: Duration,
    write_timeout: Duration,
    default_column_height: f64,
}

impl ServerConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }

    /// Returns the host the listener binds to.
    pub fn bind_host(&self) -> &str {
        &self.bind_host
    }

    /// Returns the listening port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `bind_host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }

    /// Returns how long a connection may take to deliver its request.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Returns how long writing a response may take.
    pub fn write_timeout(&self) -> Duration {
        self.write_timeout
    }

    /// Returns the column height used when a point has no usable height.
    pub fn default_column_height(&self) -> f64 {
        self.default_column_height
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            default_column_height: DEFAULT_COLUMN_HEIGHT,
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServerConfigBuilder {
    bind_host: Option<String>,
    port: Option<u16>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    default_column_height: Option<f64>,
}

impl ServerConfigBuilder {
    /// Creates a new server configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind host.
    pub fn bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = Some(host.into());
        self
    }

    /// Sets the listening port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the request read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Sets the response write timeout.
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Sets the default column height.
    pub fn default_column_height(mut self, height: f64) -> Self {
        self.default_column_height = Some(height);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the bind host is empty
    /// - the port is below 1024
    /// - either timeout is zero
    /// - the default column height is not a positive finite number
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let bind_host = self
            .bind_host
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());
        if bind_host.trim().is_empty() {
            return Err(ConfigError::new("bind_host must not be empty"));
        }

        let port = validate_port(self.port.unwrap_or(DEFAULT_PORT))?;

        let read_timeout = self.read_timeout.unwrap_or(DEFAULT_TIMEOUT);
        if read_timeout.is_zero() {
            return Err(ConfigError::new("read_timeout must be greater than zero"));
        }

        let write_timeout = self.write_timeout.unwrap_or(DEFAULT_TIMEOUT);
        if write_timeout.is_zero() {
            return Err(ConfigError::new("write_timeout must be greater than zero"));
        }

        let default_column_height = self
            .default_column_height
            .unwrap_or(DEFAULT_COLUMN_HEIGHT);
        if !default_column_height.is_finite() || default_column_height <= 0.0 {
            return Err(ConfigError::new(format!(
                "default_column_height must be positive, got {}",
                default_column_height
            )));
        }

        Ok(ServerConfig {
            bind_host,
            port,
            read_timeout,
            write_timeout,
            default_column_height,
        })
    }
}
