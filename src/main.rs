use clap::Parser;
use colored::*;
use hexrich::cli::{self, Cli, Commands};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging with HEXRICH_LOG environment variable support
    let log_level = std::env::var("HEXRICH_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<hexrich::HexrichError>() {
            Some(hexrich::HexrichError::Config(_)) => 2,
            Some(hexrich::HexrichError::Io(_)) => 3,
            Some(hexrich::HexrichError::Resolution(_)) => 4,
            Some(hexrich::HexrichError::Occurrence(_))
            | Some(hexrich::HexrichError::Unreachable(_)) => 5,
            _ => 1,
        };
        process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli::load_effective_config(&cli.config)?;

    match cli.command {
        Commands::Tree(args) => cli::commands::tree::run(args, &config).await,
        Commands::Map(args) => cli::commands::map::run(args, &config).await,
    }
}
