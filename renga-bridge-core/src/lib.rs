//! Core types and wire protocol for the Renga bridge.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod protocol;

pub use config::ConfigError;
pub use error::{BridgeError, Result};
pub use protocol::{Request, Response};
