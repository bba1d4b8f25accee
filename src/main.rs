//! Watchtrader CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use trading_config::load_config;
use trading_monitor::setup_logging;

const DEFAULT_CONFIG: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG);
        default.exists().then_some(default)
    });
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration from the environment".to_string(),
    })?;

    let log_level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    setup_logging(&log_level, cli.json_logs || config.logging.json)
        .context("Failed to initialize logging")?;

    let config_label = config_path
        .as_deref()
        .map(Path::display)
        .map(|path| path.to_string())
        .unwrap_or_else(|| "<environment>".to_string());

    match cli.command {
        Commands::Scan(args) => cli::commands::scan::run(args, config).await,
        Commands::Watch(args) => cli::commands::watch::run(args, config).await,
        Commands::Health => cli::commands::health::run(config).await,
        Commands::Indicators => cli::commands::indicators::run(),
        Commands::ValidateConfig => cli::commands::validate::run(&config_label, config),
    }
}
