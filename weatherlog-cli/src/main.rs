//! Binary crate for the `weatherlog` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Human-friendly output formatting

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use weatherlog_core::Config;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    init_logging(&config);

    cmd.run(config).await
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &Config) {
    let fallback = format!("warn,weatherlog_core={0},weatherlog={0}", config.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Logging initialized at level: {}", config.log_level);
}
