//! CLI command definitions and dispatch.

mod login;
mod logout;
mod resolve;
mod version;

use std::path::{Path, PathBuf};

use a3s_pin_core::PinConfig;
use clap::{Parser, Subcommand};

/// A3S Pin — pin Dockerfile image references to immutable digests.
#[derive(Parser)]
#[command(name = "a3s-pin", version, about)]
pub struct Cli {
    /// Configuration file (default: ~/.a3s/pin/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Rewrite a Dockerfile with every image pinned to its digest
    Resolve(resolve::ResolveArgs),
    /// Save credentials for a registry
    Login(login::LoginArgs),
    /// Remove saved credentials for a registry
    Logout(logout::LogoutArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Load the config file given on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> a3s_pin_core::Result<PinConfig> {
    match path {
        Some(path) if !path.exists() => Err(a3s_pin_core::PinError::ConfigError(format!(
            "Config file not found: {}",
            path.display()
        ))),
        Some(path) => PinConfig::load(path),
        None => PinConfig::load(&PinConfig::default_path()),
    }
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli, config: PinConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Resolve(args) => resolve::execute(args, &config).await,
        Command::Login(args) => login::execute(args).await,
        Command::Logout(args) => logout::execute(args).await,
        Command::Version(args) => version::execute(args).await,
    }
}
