//! Plugin-side server for the Renga bridge.
//!
//! The server accepts one length-prefixed JSON request per TCP connection,
//! routes it to a command handler and writes back one response. Model access
//! goes through the [`ModelStore`](store::ModelStore) trait so that the host
//! application's API stays behind a single seam.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use renga_bridge_server::{BridgeServer, ServerConfig};
//! use renga_bridge_server::store::InMemoryModelStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryModelStore::new());
//!     let server = BridgeServer::with_store(ServerConfig::default(), store).bind().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod config_file;
pub mod handlers;
pub mod identity;
pub mod reconcile;
pub mod router;
mod server;
pub mod store;

pub use config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use identity::IdentityMap;
pub use reconcile::ColumnReconciler;
pub use router::{CommandHandler, CommandRouter};
pub use server::{BridgeServer, RunningServer};
