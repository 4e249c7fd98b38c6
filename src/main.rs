//! Main entry point for the keyword-data-gateway CLI

use anyhow::Context;
use clap::Parser;
use keyword_data_gateway::cli::{Cli, CliError, Commands};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("keyword_data_gateway=info"));

    // Logs go to stderr so stdout stays clean for results
    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result: anyhow::Result<()> = match &cli.command {
        Commands::Balance(args) => args.execute(&cli).await.context("balance command failed"),
        Commands::Suggestions(args) => args.execute(&cli).await.context("suggestions command failed"),
        Commands::Overview(args) => args.execute(&cli).await.context("overview command failed"),
        Commands::Domain(args) => args.execute(&cli).await.context("domain command failed"),
    };

    if let Err(e) = result {
        match e.downcast_ref::<CliError>().and_then(CliError::hint) {
            Some(hint) => error!(hint, "Command failed: {:#}", e),
            None => error!("Command failed: {:#}", e),
        }
        std::process::exit(1);
    }
}
