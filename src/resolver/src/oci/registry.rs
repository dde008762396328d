//! Registry-backed digest resolution.
//!
//! Uses the `oci-distribution` crate to fetch the manifest a tag points at
//! (Docker Hub, GHCR, private registries) and report its digest.

use a3s_pin_core::config::{Platform, RegistryConfig};
use a3s_pin_core::error::{PinError, Result};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::manifest::ImageIndexEntry;
use oci_distribution::secrets::RegistryAuth as OciRegistryAuth;
use oci_distribution::{Client, Reference};

use super::credentials::CredentialStore;
use super::reference::{is_sha256_digest, ImageReference};
use crate::digest::DigestResolver;

/// Authentication credentials for a container registry.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
}

impl RegistryAuth {
    /// Create anonymous authentication (no credentials).
    pub fn anonymous() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    /// Create basic authentication with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Create authentication from environment variables.
    ///
    /// Reads `REGISTRY_USERNAME` and `REGISTRY_PASSWORD`.
    /// Falls back to anonymous if not set.
    pub fn from_env() -> Self {
        let username = std::env::var("REGISTRY_USERNAME").ok();
        let password = std::env::var("REGISTRY_PASSWORD").ok();

        if username.is_some() && password.is_some() {
            Self { username, password }
        } else {
            Self::anonymous()
        }
    }

    /// Credentials saved for `registry`, then env vars, then anonymous.
    pub fn from_credential_store(store: &CredentialStore, registry: &str) -> Self {
        match store.get(registry) {
            Ok(Some((username, password))) => Self::basic(username, password),
            Ok(None) => Self::from_env(),
            Err(e) => {
                tracing::warn!(registry, error = %e, "Ignoring unreadable credential store");
                Self::from_env()
            }
        }
    }

    fn to_oci_auth(&self) -> OciRegistryAuth {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => OciRegistryAuth::Basic(u.clone(), p.clone()),
            _ => OciRegistryAuth::Anonymous,
        }
    }
}

/// Resolves tags to manifest digests by querying the registry.
pub struct RegistryResolver {
    client: Client,
    platform: Option<Platform>,
    credentials: Option<CredentialStore>,
}

impl RegistryResolver {
    /// Resolver using HTTPS everywhere, index digests and env/anonymous auth.
    pub fn new() -> Self {
        Self::from_config(&RegistryConfig::default())
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        let protocol = if config.insecure_registries.is_empty() {
            ClientProtocol::Https
        } else {
            for registry in &config.insecure_registries {
                tracing::warn!(registry = %registry, "Using plain HTTP for insecure registry");
            }
            ClientProtocol::HttpsExcept(config.insecure_registries.clone())
        };

        let mut client_config = ClientConfig {
            protocol,
            ..Default::default()
        };
        if let Some(platform) = config.platform.clone() {
            client_config.platform_resolver = Some(Box::new(move |manifests: &[ImageIndexEntry]| {
                select_platform(&platform, manifests)
            }));
        }

        Self {
            client: Client::new(client_config),
            platform: config.platform.clone(),
            credentials: None,
        }
    }

    /// Look up per-registry credentials in `store` before falling back to env vars.
    pub fn with_credentials(mut self, store: CredentialStore) -> Self {
        self.credentials = Some(store);
        self
    }

    fn auth_for(&self, registry: &str) -> RegistryAuth {
        match &self.credentials {
            Some(store) => RegistryAuth::from_credential_store(store, registry),
            None => RegistryAuth::from_env(),
        }
    }

    /// Fetch the manifest digest `reference` currently points at.
    ///
    /// Without a platform this is the top-level digest (the image index for
    /// multi-arch images); with one, the digest of the matching manifest.
    pub async fn fetch_digest(&self, reference: &ImageReference) -> Result<String> {
        let oci_ref = to_oci_reference(reference)?;
        let auth = self.auth_for(&reference.registry).to_oci_auth();
        let registry_error = |e: oci_distribution::errors::OciDistributionError| {
            PinError::RegistryError {
                registry: reference.registry.clone(),
                message: format!("Failed to fetch manifest for {}: {}", reference, e),
            }
        };

        let digest = match self.platform {
            Some(ref platform) => {
                tracing::debug!(reference = %reference, platform = %platform, "Fetching platform manifest");
                let (_manifest, digest) = self
                    .client
                    .pull_image_manifest(&oci_ref, &auth)
                    .await
                    .map_err(registry_error)?;
                digest
            }
            None => {
                tracing::debug!(reference = %reference, "Fetching manifest");
                let (_manifest, digest) = self
                    .client
                    .pull_manifest(&oci_ref, &auth)
                    .await
                    .map_err(registry_error)?;
                digest
            }
        };

        if !is_sha256_digest(&digest) {
            return Err(PinError::RegistryError {
                registry: reference.registry.clone(),
                message: format!("Unexpected manifest digest '{}' for {}", digest, reference),
            });
        }
        Ok(digest)
    }
}

impl Default for RegistryResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DigestResolver for RegistryResolver {
    async fn resolve(&self, reference: &ImageReference) -> Result<ImageReference> {
        let digest = self.fetch_digest(reference).await?;
        tracing::info!(reference = %reference, digest = %digest, "Resolved image digest");
        Ok(reference.pinned(digest))
    }
}

/// Convert an ImageReference to an oci-distribution Reference.
fn to_oci_reference(reference: &ImageReference) -> Result<Reference> {
    let ref_str = match (&reference.digest, &reference.tag) {
        (Some(digest), _) => format!("{}@{}", reference.repository_name(), digest),
        (None, Some(tag)) => format!("{}:{}", reference.repository_name(), tag),
        (None, None) => format!("{}:latest", reference.repository_name()),
    };

    ref_str.parse::<Reference>().map_err(|e| {
        PinError::InvalidReference(format!("'{}': {}", ref_str, e))
    })
}

/// Pick the index entry matching `platform`.
fn select_platform(platform: &Platform, manifests: &[ImageIndexEntry]) -> Option<String> {
    manifests
        .iter()
        .find(|entry| {
            entry.platform.as_ref().map_or(false, |p| {
                matches_platform(platform, &p.os, &p.architecture, p.variant.as_deref())
            })
        })
        .map(|entry| entry.digest.clone())
}

/// A missing variant in the target matches any variant of the entry.
fn matches_platform(target: &Platform, os: &str, architecture: &str, variant: Option<&str>) -> bool {
    target.os == os
        && target.architecture == architecture
        && target
            .variant
            .as_deref()
            .map_or(true, |wanted| variant == Some(wanted))
}
