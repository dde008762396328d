//! `a3s-pin logout` command — Forget saved registry credentials.

use a3s_pin_core::error::Result;
use a3s_pin_resolver::CredentialStore;
use clap::Args;

#[derive(Args)]
pub struct LogoutArgs {
    /// Registry server (default: index.docker.io)
    pub server: Option<String>,
}

pub async fn execute(args: LogoutArgs) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let server = args.server.unwrap_or_else(|| super::login::DEFAULT_SERVER.to_string());
    println!("{}", logout(&CredentialStore::default_path()?, &server)?);
    Ok(())
}

/// Remove `server` from `store`, naming the registries still saved when it had no entry.
fn logout(store: &CredentialStore, server: &str) -> Result<String> {
    if store.remove(server)? {
        return Ok(format!("Removed credentials for {}", server));
    }

    let saved = store.list_registries()?;
    if saved.is_empty() {
        Ok(format!("No credentials saved for {}", server))
    } else {
        Ok(format!(
            "No credentials saved for {} (saved: {})",
            server,
            saved.join(", ")
        ))
    }
}
