//! ecoatlas server binary.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use ecoatlas::server::{init_metrics, init_tracing, App, ServerConfig};
use ecoatlas::storage::{init_storage, Database};
use ecoatlas::{Config, Result};

/// Read-only REST backend for the country/indicator dataset, with static
/// hosting of the frontend bundle.
#[derive(Parser, Debug)]
#[command(name = "ecoatlas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory for the `SQLite` database
    #[arg(short, long, env = "ECOATLAS_DATA_DIR", default_value = "./data")]
    data_dir: std::path::PathBuf,

    /// Directory containing the pre-built frontend bundle
    #[arg(short, long, env = "ECOATLAS_CLIENT_DIR", default_value = "./client/dist")]
    client_dir: std::path::PathBuf,

    /// Host address to bind to
    #[arg(long, env = "ECOATLAS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "ECOATLAS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "ECOATLAS_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            data_dir: self.data_dir,
            client_dir: self.client_dir,
            host: self.host,
            port: self.port,
            log_level: self.log_level,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_json = cli.log_json;

    let config = cli.into_config();
    init_tracing(&config.log_level, log_json);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server_addr(),
        data_dir = %config.data_dir.display(),
        client_dir = %config.client_dir.display(),
        "starting ecoatlas"
    );

    // An unopenable or unmigratable store is fatal; an empty one is not.
    let db = Database::open(config.database_path())?;
    init_storage(&db)?;

    init_metrics();

    let app = App::new(
        ServerConfig {
            host: config.host,
            port: config.port,
            client_dir: config.client_dir,
        },
        db,
    );
    app.run().await
}
