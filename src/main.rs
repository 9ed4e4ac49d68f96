mod config;
mod database;
mod entities;
mod http_server;
mod logging;
mod ports;
mod services;
mod spotify_rs;
#[cfg(test)]
mod test_utils;
mod tidal_rs;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::{Result, eyre::Context};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::{
    config::Config,
    database::Database,
    http_server::state::AppState,
    logging::init_tracing,
    ports::{destination::DestinationClient, kv::KeyValueStore, queue::JobQueue},
    services::{
        background::spawn_import_workers, import::worker::ImportWorker,
        kv_store::SqliteKeyValueStore, queue::SqliteJobQueue,
        spotify::client::SpotifyCatalogAdapter, tidal::client::TidalHttpAdapter,
    },
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The config file to use
    #[arg(short, long, env = "YOINKLIST_CONFIG")]
    config: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `yoinklist=debug,sea_orm=warn`
    #[arg(long, default_value = "info", global = true, env = "LOG_LEVEL")]
    log_level: String,

    /// Export spans to this OTLP/gRPC collector
    #[arg(long, global = true, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the GraphQL API and run import workers in the same process
    Serve {
        /// The port to run the server on
        #[arg(short, long, default_value = "3000", env = "YOINKLIST_HTTP_PORT")]
        port: u16,
    },
    /// Only run import workers against the shared database
    Work,
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Create a default config file, if it doesn't exist
    CreateDefault,
    /// Print the path to the config file
    Path,
}

/// Everything both `serve` and `work` need.
struct Runtime {
    db: Arc<Database>,
    queue: Arc<dyn JobQueue>,
    destination: Arc<dyn DestinationClient>,
    workers: Vec<JoinHandle<()>>,
}

async fn start_runtime(config: &Config) -> Result<Runtime> {
    let db = Arc::new(Database::open(&config.database_path()).await?);
    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(db.clone()));
    let notify = Arc::new(Notify::new());
    let queue: Arc<dyn JobQueue> = Arc::new(SqliteJobQueue::new(db.clone(), notify.clone()));
    let destination: Arc<dyn DestinationClient> = Arc::new(TidalHttpAdapter::new(&config.tidal)?);

    let worker = Arc::new(ImportWorker::new(kv, destination.clone(), config)?);
    let workers = spawn_import_workers(queue.clone(), worker, config.worker.clone(), notify);
    tracing::info!(count = workers.len(), "Import workers running");

    Ok(Runtime {
        db,
        queue,
        destination,
        workers,
    })
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Config(config_commands) => match config_commands {
            ConfigCommands::CreateDefault => {
                let path = Config::create_default()?;
                tracing::info!("Default config at {}", path.display());
            }
            ConfigCommands::Path => match Config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("No default config path found"),
            },
        },
        Commands::Serve { port } => {
            let runtime = start_runtime(&config).await?;
            let source = Arc::new(SpotifyCatalogAdapter::new(&config)?);
            let app_state = Arc::new(AppState::new(
                runtime.db,
                config.import.clone(),
                runtime.queue,
                source,
                runtime.destination,
            )?);

            tracing::info!("Starting HTTP server on port: {}", port);
            let served = http_server::app::start(port, app_state).await;
            runtime.workers.iter().for_each(JoinHandle::abort);
            served?;
        }
        Commands::Work => {
            let runtime = start_runtime(&config).await?;
            tokio::signal::ctrl_c()
                .await
                .wrap_err("Failed to listen for shutdown signal")?;
            tracing::info!("Shutting down import workers");
            runtime.workers.iter().for_each(JoinHandle::abort);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _tracing = init_tracing("yoinklist", args.otlp_endpoint.as_deref(), &args.log_level)?;

    tracing::debug!("Loading configuration");
    let config = {
        if let Some(config) = &args.config {
            Config::from_file(config)
        } else {
            Config::load()
        }
    }
    .wrap_err("Failed to load yoinklist config")?;

    run(args.command, config).await
}
