//! Standalone bridge server backed by an in-memory model.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use renga_bridge_server::store::InMemoryModelStore;
use renga_bridge_server::{BridgeServer, ConfigError, ServerConfig, ServerConfigBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "renga-bridge-server", version, about = "Serve the Renga bridge protocol")]
struct Args {
    /// Configuration file (.yaml, .yml or .toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Bind host; overrides the configuration.
    #[arg(long)]
    host: Option<String>,
    /// Listening port; overrides the configuration.
    #[arg(long)]
    port: Option<u16>,
}

fn load(args: &Args) -> Result<ServerConfig, ConfigError> {
    let base = match &args.config {
        #[cfg(feature = "config-file")]
        Some(path) => renga_bridge_server::config_file::load_config(path)?,
        #[cfg(not(feature = "config-file"))]
        Some(_) => return Err(ConfigError::new("built without the config-file feature")),
        None => ServerConfig::from_env()?,
    };

    ServerConfigBuilder::new()
        .bind_host(args.host.clone().unwrap_or_else(|| base.bind_host().to_string()))
        .port(args.port.unwrap_or(base.port()))
        .read_timeout(base.read_timeout())
        .write_timeout(base.write_timeout())
        .default_column_height(base.default_column_height())
        .build()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    let store = Arc::new(InMemoryModelStore::new());
    let server = match BridgeServer::with_store(config, store).bind().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start bridge server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    server.shutdown().await;
    ExitCode::SUCCESS
}
