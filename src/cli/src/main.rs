//! A3S Pin CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use a3s_pin_cli::commands::{dispatch, load_config, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing; stdout is reserved for the rewritten Dockerfile
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter())),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dispatch(cli, config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
