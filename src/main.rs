mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use mcp_fleet::docker::{ContainerRuntime, DockerEngine};
use mcp_fleet::logging::{LogBuffer, Logger};
use mcp_fleet::records::FileRecordStore;
use mcp_fleet::{Error as FleetError, Parser as ConfigParser, Reconciler};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(fleet_error) = e.downcast_ref::<FleetError>() {
            eprintln!("Error: {}", fleet_error);
            if let Some(suggestion) = fleet_error.suggestion() {
                eprintln!("\nHint: {}", suggestion);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigParser::new().load_or_default(cli.config.as_deref())?;
    init_tracing(config.logging.debug)?;

    let logger = Logger::new(Arc::new(LogBuffer::new(config.logging.buffer_size)))
        .with_debug(config.logging.debug);
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerEngine::connect().map_err(FleetError::from)?);
    let cancel = CancellationToken::new();

    if let Commands::Monitor = cli.command {
        return commands::run_monitor(runtime, config.monitor.clone(), cancel).await;
    }

    let records = Arc::new(FileRecordStore::open(config.records_path()).await?);
    let reconciler = Reconciler::builder()
        .runtime(runtime)
        .records(records)
        .logger(logger.clone())
        .cancellation(cancel.clone())
        .build()?;

    let defaults = &config.server_defaults;
    let result = match &cli.command {
        Commands::List { json } => commands::run_list(&reconciler, *json).await,
        Commands::Start { id } => commands::run_start(&reconciler, id).await,
        Commands::Stop { id } => commands::run_stop(&reconciler, id).await,
        Commands::Restart { id } => commands::run_restart(&reconciler, id).await,
        Commands::Remove { id, force } => commands::run_remove(&reconciler, id, *force).await,
        Commands::Pull { image } => commands::run_pull(&reconciler, image).await,
        Commands::Orphans { cleanup } => commands::run_orphans(&reconciler, *cleanup).await,
        Commands::ReallocatePorts { base } => {
            commands::run_reallocate(&reconciler, *base, defaults).await
        }
        Commands::ApplySettings => commands::run_apply_settings(&reconciler, defaults).await,
        Commands::Dangling { json } => commands::run_dangling(&reconciler, *json).await,
        Commands::Repair { server_id } => commands::run_repair(&reconciler, server_id).await,
        Commands::Monitor => Ok(()),
    };

    logger.shutdown();
    result
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
