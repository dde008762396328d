//! `a3s-pin version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub async fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("a3s-pin version {}", a3s_pin_core::VERSION);
    Ok(())
}
