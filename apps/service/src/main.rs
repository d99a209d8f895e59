use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use checkwatch_service::Engine;
use checkwatch_service::config::Config;

/// Periodic health checks with state-change alerts
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/checkwatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run one gather tick and one log rotation, then exit
    #[arg(long)]
    once: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();
    let cli = Cli::parse();

    let config = Config::from_config(cli.config.as_ref()).context("loading configuration")?;
    if cli.print_config {
        print!("{config}");
        return Ok(());
    }
    info!("{}", config);

    if let Some(days) = config.retention.archive_retention_days {
        warn!(days, "archive_retention_days is set but archives are never pruned");
    }

    let engine = Engine::from_config(&config).await.context("building monitoring engine")?;

    if cli.once {
        let report = engine.scheduler.tick().await;
        info!(?report, "Single gather tick complete");
        let rotation = engine.rotator.rotate_all().await;
        info!(rotated = rotation.rotated.len(), failed = rotation.failed.len(), "Single rotation complete");
        return Ok(());
    }

    let handle = engine.service.start();

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    info!("Shutdown requested, waiting for running evaluations");
    handle.stop().await;

    Ok(())
}
