//! Configuration error shared by the client and server configs.

use crate::error::BridgeError;
use crate::protocol::MIN_PORT;

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    /// Creates a configuration error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        BridgeError::Configuration(err.message)
    }
}

/// Checks that `port` lies in the unprivileged range `1024..=65535`.
pub fn validate_port(port: u16) -> Result<u16, ConfigError> {
    if port < MIN_PORT {
        return Err(ConfigError::new(format!(
            "port must be between {} and 65535, got {}",
            MIN_PORT, port
        )));
    }
    Ok(port)
}
