//! Async client for the Renga bridge plugin.
//!
//! The plugin runs inside the host CAD application and accepts one JSON
//! request per TCP connection. This crate sends those requests, builds the
//! `update_points` batches with stable point identities, and loads client
//! settings from code, files or the environment.
//!
//! ```rust,no_run
//! use renga_bridge_client::{BridgeClient, ClientConfig};
//! use renga_bridge_client::commands::PointIdentityTracker;
//! use renga_bridge_core::protocol::Point3;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BridgeClient::new(ClientConfig::builder().port(50100).build()?);
//!
//!     let mut tracker = PointIdentityTracker::new();
//!     let body = tracker.build_request(&[Point3::new(0.0, 0.0, 0.0)], &[3000.0]);
//!     let results = client.update_points(&body).await?;
//!     tracker.record_results(&results);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

mod client;
pub mod commands;
pub mod config;
pub mod config_file;
pub mod connection;

pub use client::BridgeClient;
pub use commands::PointIdentityTracker;
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError};
pub use connection::{Connection, ConnectionId};
pub use renga_bridge_core as core;
