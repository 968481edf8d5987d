//! Main entry point for the Mottu rental service

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use mottu_rental::{
    config::Config,
    domain::SystemClock,
    server::{open_store, AppState, Server},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "mottu-rental",
    about = "Mottu motorcycle rental service",
    version,
    author
)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    gen_config: bool,

    /// Validate configuration without starting the server
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    mottu_common::logging::init_logging(&args.verbosity, "mottu_rental=info,tower_http=info")?;

    if args.gen_config {
        println!("{}", Config::generate_example()?);
        return Ok(());
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;

    info!(
        "Starting Mottu rental service v{} ({:?} storage)",
        mottu_rental::VERSION,
        config.storage.backend
    );

    if args.dry_run {
        info!(
            "HTTP listen address: {}:{}",
            config.server.listen_address, config.server.port
        );
        info!("Database URL: {}", config.database_display());
        info!(
            "API key required: {}",
            if config.auth.api_key.is_some() { "yes" } else { "no" }
        );
        info!("Configuration validated successfully (dry-run mode)");
        return Ok(());
    }

    let store = open_store(&config)
        .await
        .context("Failed to open rental store")?;
    let state = AppState::new(config, store, Arc::new(SystemClock));
    let server = Server::new(state);

    match server.run().await {
        Ok(()) => {
            info!("Mottu rental service shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Mottu rental service error: {}", e);
            Err(e.into())
        }
    }
}
