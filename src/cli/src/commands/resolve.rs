//! `a3s-pin resolve` command — Pin every image in a Dockerfile.
//!
//! Reads the Dockerfile, resolves each `FROM`/`COPY --from=` image against
//! its registry, and prints the rewritten file or writes it to `--output`.
//! Nothing is written when any lookup fails.

use std::path::PathBuf;

use a3s_pin_core::{PinConfig, Platform, RegistryConfig};
use a3s_pin_resolver::{CredentialStore, DigestResolver, DockerfilePinner, RegistryResolver};
use clap::Args;

#[derive(Args)]
pub struct ResolveArgs {
    /// Path to the Dockerfile
    pub dockerfile: PathBuf,

    /// Write the pinned Dockerfile to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pin the manifest for this platform (e.g. "linux/amd64") instead of the image index
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Registry to reach over plain HTTP (e.g. "localhost:5000"), can be repeated
    #[arg(long = "insecure-registry")]
    pub insecure_registries: Vec<String>,

    /// Query the registry for every occurrence of a repeated image
    #[arg(long)]
    pub no_memoize: bool,
}

pub async fn execute(args: ResolveArgs, config: &PinConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut resolver = RegistryResolver::from_config(&registry_config(&args, config));
    match CredentialStore::default_path() {
        Ok(store) => resolver = resolver.with_credentials(store),
        Err(e) => tracing::warn!(error = %e, "Credential store unavailable, using environment credentials"),
    }
    run(&args, config, &resolver).await
}

async fn run<R: DigestResolver>(
    args: &ResolveArgs,
    config: &PinConfig,
    resolver: &R,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&args.dockerfile)
        .map_err(|e| format!("Failed to read {}: {}", args.dockerfile.display(), e))?;

    let rewrite = DockerfilePinner::new(resolver)
        .memoize(config.memoize && !args.no_memoize)
        .rewrite(&content)
        .await?;

    tracing::info!(
        dockerfile = %args.dockerfile.display(),
        pinned = rewrite.summary.pinned,
        already_pinned = rewrite.summary.already_pinned,
        skipped = rewrite.summary.skipped,
        "Dockerfile resolved"
    );

    match &args.output {
        Some(path) => std::fs::write(path, &rewrite.content)
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?,
        None => print!("{}", rewrite.content),
    }

    Ok(())
}

/// Command-line flags layered over the config file.
fn registry_config(args: &ResolveArgs, config: &PinConfig) -> RegistryConfig {
    let mut registry = config.registry.clone();
    for host in &args.insecure_registries {
        if !registry.insecure_registries.contains(host) {
            registry.insecure_registries.push(host.clone());
        }
    }
    if let Some(ref platform) = args.platform {
        registry.platform = Some(platform.clone());
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use a3s_pin_core::{PinError, Result};
    use a3s_pin_resolver::ImageReference;
    use async_trait::async_trait;
    use clap::Parser;
    use tempfile::TempDir;

    /// Resolver for documents that should never need a lookup.
    struct Unreachable;

    #[async_trait]
    impl DigestResolver for Unreachable {
        async fn resolve(&self, reference: &ImageReference) -> Result<ImageReference> {
            Err(PinError::RegistryError {
                registry: reference.registry.clone(),
                message: "unreachable in tests".to_string(),
            })
        }
    }

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ResolveArgs,
    }

    fn parse(argv: &[&str]) -> ResolveArgs {
        let mut full = vec!["resolve"];
        full.extend_from_slice(argv);
        TestCli::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&[
            "Dockerfile",
            "-o",
            "Dockerfile.pinned",
            "--platform",
            "linux/arm64",
            "--insecure-registry",
            "localhost:5000",
        ]);
        assert_eq!(args.dockerfile, PathBuf::from("Dockerfile"));
        assert_eq!(args.output, Some(PathBuf::from("Dockerfile.pinned")));
        assert_eq!(args.platform.unwrap().architecture, "arm64");
        assert_eq!(args.insecure_registries, vec!["localhost:5000"]);
        assert!(!args.no_memoize);
    }

    #[test]
    fn test_parse_rejects_bad_platform() {
        let result = TestCli::try_parse_from(["resolve", "Dockerfile", "--platform", "linux"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_config_merges_flags() {
        let mut config = PinConfig::default();
        config.registry.insecure_registries = vec!["localhost:5000".to_string()];
        config.registry.platform = Some("linux/amd64".parse().unwrap());

        let args = parse(&[
            "Dockerfile",
            "--insecure-registry",
            "localhost:5000",
            "--insecure-registry",
            "registry.local",
            "--platform",
            "linux/arm64",
        ]);
        let merged = registry_config(&args, &config);
        assert_eq!(
            merged.insecure_registries,
            vec!["localhost:5000", "registry.local"]
        );
        assert_eq!(merged.platform.unwrap().to_string(), "linux/arm64");
    }

    #[test]
    fn test_registry_config_keeps_file_platform() {
        let mut config = PinConfig::default();
        config.registry.platform = Some("linux/amd64".parse().unwrap());
        let merged = registry_config(&parse(&["Dockerfile"]), &config);
        assert_eq!(merged.platform.unwrap().to_string(), "linux/amd64");
    }

    #[tokio::test]
    async fn test_run_writes_output_file() {
        let dir = TempDir::new().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        let output = dir.path().join("Dockerfile.pinned");
        std::fs::write(&dockerfile, "FROM scratch\nCOPY app /app\nFROM $(BASE)").unwrap();

        let args = parse(&[
            dockerfile.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        run(&args, &PinConfig::default(), &Unreachable).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "FROM scratch\nCOPY app /app\nFROM $(BASE)\n"
        );
    }

    #[tokio::test]
    async fn test_run_failure_leaves_output_untouched() {
        let dir = TempDir::new().unwrap();
        let dockerfile = dir.path().join("Dockerfile");
        let output = dir.path().join("Dockerfile.pinned");
        std::fs::write(&dockerfile, "FROM alpine:3.13\n").unwrap();

        let args = parse(&[
            dockerfile.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        let err = run(&args, &PinConfig::default(), &Unreachable)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("alpine:3.13"));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_run_missing_dockerfile() {
        let dir = TempDir::new().unwrap();
        let args = parse(&[dir.path().join("Dockerfile").to_str().unwrap()]);
        let err = run(&args, &PinConfig::default(), &Unreachable)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
