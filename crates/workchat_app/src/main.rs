mod app;
mod commands;
mod config;
mod effects;
mod logging;
mod render;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use workchat_logging::wc_info;

use crate::config::{ClientConfig, DEFAULT_CONFIG_FILE};
use crate::logging::LogDestination;

/// Terminal client for the WorkChat knowledge assistant.
#[derive(Debug, Parser)]
#[command(name = "workchat", version)]
struct Cli {
    /// RON configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Backend base URL, overrides the configuration file.
    #[arg(long)]
    base_url: Option<String>,

    /// Where log output goes.
    #[arg(long, value_enum)]
    log: Option<LogDestination>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(destination) = cli.log {
        config.log_destination = destination;
    }

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        config.level_filter()
    };
    logging::initialize(config.log_destination, level);
    wc_info!("workchat {} starting", env!("CARGO_PKG_VERSION"));

    app::run(&config)
}
