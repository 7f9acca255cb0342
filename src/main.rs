//! Membership engine administration CLI.
//!
//! Loads configuration, initialises logging, and runs one subcommand
//! against the configured store.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use membership_core::config::{AppConfig, LoggingConfig};

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_configuration(&cli).context("Failed to load configuration")?;
    init_logging(&config.logging);

    tracing::debug!(config = %cli.config, "Configuration loaded");
    cli.execute(config).await?;
    Ok(())
}

/// Load configuration from file and environment, then apply CLI overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<AppConfig> {
    Ok(AppConfig::load_with_database_url(
        &cli.config,
        cli.database_url.as_deref(),
    )?)
}

/// Initialize tracing/logging
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
