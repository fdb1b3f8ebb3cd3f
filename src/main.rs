//! Main entry point for the energy-data-collector CLI

use clap::Parser;
use energy_data_collector::cli::{self, Cli, Commands};
use energy_data_collector::config::Config;
use energy_data_collector::shutdown;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("energy_data_collector=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();

    shutdown::install_signal_handler();

    let result = match cli.command {
        Commands::Collect(ref args) => args.execute(&config).await,
        Commands::Catalog(ref args) => args.execute(&config).await,
        Commands::Providers => {
            cli::print_providers(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("command failed: {}", e);
        std::process::exit(1);
    }
}
