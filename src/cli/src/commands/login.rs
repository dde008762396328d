//! `a3s-pin login` command — Save registry credentials for digest lookups.

use std::io::BufRead;

use a3s_pin_resolver::CredentialStore;
use clap::Args;

/// Registry used when no server is given.
pub(super) const DEFAULT_SERVER: &str = "index.docker.io";

#[derive(Args)]
pub struct LoginArgs {
    /// Registry server (default: index.docker.io)
    pub server: Option<String>,

    /// Username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password
    #[arg(short, long)]
    pub password: Option<String>,

    /// Read password from stdin
    #[arg(long)]
    pub password_stdin: bool,
}

pub async fn execute(args: LoginArgs) -> Result<(), Box<dyn std::error::Error>> {
    let server = args.server.unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    let username = match args.username {
        Some(u) => u,
        None => prompt(&mut input, "Username: ")?,
    };

    let password = match (args.password_stdin, args.password) {
        (true, _) => read_trimmed_line(&mut input)?,
        (false, Some(p)) => p,
        (false, None) => prompt(&mut input, "Password: ")?,
    };

    if username.is_empty() || password.is_empty() {
        return Err("Username and password are required".into());
    }

    CredentialStore::default_path()?.store(&server, &username, &password)?;
    tracing::debug!(server = %server, "Stored registry credentials");

    println!("Login Succeeded");
    Ok(())
}

fn prompt(input: &mut impl BufRead, label: &str) -> std::io::Result<String> {
    eprint!("{label}");
    read_trimmed_line(input)
}

fn read_trimmed_line(input: &mut impl BufRead) -> std::io::Result<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
