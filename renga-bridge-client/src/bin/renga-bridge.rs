//! Command-line client for the Renga bridge plugin.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use renga_bridge_client::commands::{get_walls_request, update_points_request, PointIdentityTracker};
use renga_bridge_client::{BridgeClient, ClientConfig, ClientConfigBuilder, ConfigError};
use renga_bridge_core::protocol::Point3;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "renga-bridge", version, about = "Send commands to the Renga bridge plugin")]
struct Args {
    /// Configuration file (.yaml, .yml or .toml).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Plugin host; overrides the configuration.
    #[arg(long)]
    host: Option<String>,
    /// Plugin port; overrides the configuration.
    #[arg(long)]
    port: Option<u16>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the plugin accepts connections.
    Ping,
    /// Print the walls of the active model.
    Walls,
    /// Create or update one column per point.
    Columns {
        /// Points as `x,y,z`.
        #[arg(required = true, value_parser = parse_point)]
        points: Vec<Point3>,
        /// Column heights; the last one is reused for remaining points.
        #[arg(long)]
        height: Vec<f64>,
    },
}

fn parse_point(s: &str) -> Result<Point3, String> {
    let coords = s
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in \"{s}\": {e}"))?;

    match coords[..] {
        [x, y] => Ok(Point3::new(x, y, 0.0)),
        [x, y, z] => Ok(Point3::new(x, y, z)),
        _ => Err(format!("expected x,y or x,y,z, got \"{s}\"")),
    }
}

fn load(args: &Args) -> Result<ClientConfig, ConfigError> {
    let base = match &args.config {
        #[cfg(feature = "config-file")]
        Some(path) => renga_bridge_client::config_file::load_config(path)?,
        #[cfg(not(feature = "config-file"))]
        Some(_) => return Err(ConfigError::new("built without the config-file feature")),
        None => ClientConfig::from_env()?,
    };

    ClientConfigBuilder::new()
        .host(args.host.clone().unwrap_or_else(|| base.host().to_string()))
        .port(args.port.unwrap_or(base.port()))
        .connect_timeout(base.connect_timeout())
        .io_timeout(base.io_timeout())
        .build()
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    let client = BridgeClient::new(config);

    let response = match args.command {
        Command::Ping => {
            let reachable = client.is_reachable().await;
            println!(
                "{} {}",
                client.config().address(),
                if reachable { "reachable" } else { "unreachable" }
            );
            return if reachable { ExitCode::SUCCESS } else { ExitCode::FAILURE };
        }
        Command::Walls => client.send(&get_walls_request()).await,
        Command::Columns { points, height } => {
            let body = PointIdentityTracker::new().build_request(&points, &height);
            match update_points_request(&body) {
                Ok(request) => client.send(&request).await,
                Err(e) => {
                    eprintln!("{e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{e}"),
    }

    if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
