//! Client configuration types and builders.

use std::time::Duration;

use renga_bridge_core::config::validate_port;
use renga_bridge_core::protocol::{DEFAULT_PORT, DEFAULT_TIMEOUT};

pub use renga_bridge_core::config::ConfigError;

/// Default plugin host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = DEFAULT_TIMEOUT;
/// Default read/write timeout.
pub const DEFAULT_IO_TIMEOUT: Duration = DEFAULT_TIMEOUT;

/// Connection settings for a [`BridgeClient`](crate::BridgeClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    port: u16,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the plugin host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the plugin port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port`.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the timeout applied to each read and write.
    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    connect_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Creates a new client configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plugin host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the plugin port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the read/write timeout.
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the host is empty
    /// - the port is below 1024
    /// - either timeout is zero
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            return Err(ConfigError::new("host must not be empty"));
        }

        let port = validate_port(self.port.unwrap_or(DEFAULT_PORT))?;

        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        if connect_timeout.is_zero() {
            return Err(ConfigError::new("connect_timeout must be greater than zero"));
        }

        let io_timeout = self.io_timeout.unwrap_or(DEFAULT_IO_TIMEOUT);
        if io_timeout.is_zero() {
            return Err(ConfigError::new("io_timeout must be greater than zero"));
        }

        Ok(ClientConfig {
            host,
            port,
            connect_timeout,
            io_timeout,
        })
    }
}
