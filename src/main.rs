// Main entry point - Logging, configuration and command dispatch
mod domain;
mod application;
mod infrastructure;
mod presentation;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::infrastructure::config::load_app_config;
use crate::presentation::cli::Cli;
use crate::presentation::commands::execute;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = load_app_config(cli.config.as_deref())?;

    execute(cli.command, config).await
}
