//! Error types for bridge operations.

use std::io;
use thiserror::Error;

/// The main error type for bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connection-related errors (connect, read or write failures).
    #[error("connection error: {0}")]
    Connection(String),

    /// The peer closed the stream before a complete frame arrived.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Malformed frames (invalid length prefix, oversized payload).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON encoding/decoding errors.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Connect, read or write timeouts.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// Invalid request data (bad point data, missing identity).
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures reported by the model store (transactions, missing entities).
    #[error("model store error: {0}")]
    ModelStore(String),

    /// No handler is registered for the requested command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The server answered with `success=false`.
    #[error("remote error: {0}")]
    Remote(String),

    /// Configuration errors (invalid settings).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O errors from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// Returns true if the error was produced by the transport rather than
    /// by request handling.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::Connection(_)
                | BridgeError::ConnectionClosed(_)
                | BridgeError::Protocol(_)
                | BridgeError::Timeout(_)
                | BridgeError::Io(_)
        )
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
