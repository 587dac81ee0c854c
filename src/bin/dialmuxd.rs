use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dialmux::api::Api;
use dialmux::clock::SystemClock;
use dialmux::config::Config;
use dialmux::driver::CommandDriver;
use dialmux::registry::LeaseRegistry;
use dialmux::server;
use dialmux::sweeper::Sweeper;

#[derive(Parser)]
#[command(name = "dialmuxd", version, about = "Shares one dial-up link between LAN clients")]
struct Cli {
    /// Path to the config file (default: search the usual locations)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose mode (-v, -vv)
    #[arg(short, action = ArgAction::Count)]
    verbosity: u8,
}

fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("caught interrupt, shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbosity);

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::discover()?,
    };

    info!("starting");
    let driver = Arc::new(CommandDriver::new(
        config.commands.dial.clone(),
        config.commands.hangup.clone(),
        config.commands.probe.clone(),
    ));
    let registry = Arc::new(LeaseRegistry::new(driver, Arc::new(SystemClock)));

    let sweeper = Sweeper::spawn(
        registry.clone(),
        config.sweeper.period(),
        config.sweeper.stale_timeout(),
    );

    let api = Arc::new(Api::new(registry));
    server::serve(api, config.server.port, shutdown_signal()).await?;

    sweeper.stop().await;
    info!("exit");
    Ok(())
}
