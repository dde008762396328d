//! OCI image reference parsing.
//!
//! Parses references like `alpine:3.13` or `ghcr.io/org/app@sha256:...` into
//! structured components and renders them in fully-qualified form
//! (`index.docker.io/library/alpine:3.13`). Parsing is strict enough to reject
//! templated references such as `alpine:$(TAG)`.

use a3s_pin_core::error::{PinError, Result};

/// Canonical Docker Hub registry host.
pub const DOCKER_HUB_REGISTRY: &str = "index.docker.io";

/// Default tag when none is specified.
const DEFAULT_TAG: &str = "latest";

/// Repository namespace Docker Hub uses for official images.
const OFFICIAL_NAMESPACE: &str = "library";

/// Digest algorithm accepted in references.
const DIGEST_ALGORITHM: &str = "sha256";

const SHA256_HEX_LEN: usize = 64;
const MAX_TAG_LEN: usize = 128;
const MAX_REPOSITORY_LEN: usize = 255;

/// Parsed OCI image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    /// Registry hostname (e.g., "ghcr.io", "index.docker.io")
    pub registry: String,
    /// Repository path (e.g., "library/nginx", "org/app")
    pub repository: String,
    /// Tag (e.g., "latest", "3.13")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:469b6e04...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// Supports formats:
    /// - `nginx` → index.docker.io/library/nginx:latest
    /// - `nginx:1.25` → index.docker.io/library/nginx:1.25
    /// - `myuser/myimage` → index.docker.io/myuser/myimage:latest
    /// - `ghcr.io/org/image:tag` → ghcr.io/org/image:tag
    /// - `ghcr.io/org/image@sha256:abc...` → ghcr.io/org/image@sha256:abc...
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(PinError::InvalidReference(
                "Empty image reference".to_string(),
            ));
        }

        // Split off digest first (@ separator)
        let (name_tag, digest) = match reference.split_once('@') {
            Some((name_tag, digest)) => {
                validate_digest(reference, digest)?;
                (name_tag, Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // A tag is the part after the last colon that follows the last slash,
        // so `localhost:5000/app` keeps its port.
        let name_start = name_tag.rfind('/').map_or(0, |pos| pos + 1);
        let (name, tag) = match name_tag[name_start..].rfind(':') {
            Some(colon) => {
                let split = name_start + colon;
                (&name_tag[..split], Some(&name_tag[split + 1..]))
            }
            None => (name_tag, None),
        };

        if let Some(tag) = tag {
            validate_tag(reference, tag)?;
        }

        let (registry, repository) = Self::split_registry_repository(reference, name)?;

        // Apply default tag if no tag and no digest
        let tag = match (tag, &digest) {
            (None, None) => Some(DEFAULT_TAG.to_string()),
            (tag, _) => tag.map(str::to_string),
        };

        Ok(ImageReference {
            registry,
            repository,
            tag,
            digest,
        })
    }

    /// Split a name into registry and repository components.
    fn split_registry_repository(reference: &str, name: &str) -> Result<(String, String)> {
        // The first component is a registry when it looks like a hostname
        // (contains a dot or colon, or is "localhost").
        let (registry, repository) = match name.split_once('/') {
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                validate_registry(reference, first)?;
                (normalize_registry(first), rest.to_string())
            }
            _ => (DOCKER_HUB_REGISTRY.to_string(), name.to_string()),
        };

        validate_repository(reference, &repository)?;

        // Single name like "nginx" → "library/nginx" on Docker Hub
        let repository = if registry == DOCKER_HUB_REGISTRY && !repository.contains('/') {
            format!("{}/{}", OFFICIAL_NAMESPACE, repository)
        } else {
            repository
        };

        Ok((registry, repository))
    }

    /// Registry and repository without tag or digest (e.g. `index.docker.io/library/alpine`).
    pub fn repository_name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Digest-qualified form of this reference: tag dropped, digest set.
    pub fn pinned(&self, digest: impl Into<String>) -> Self {
        Self {
            registry: self.registry.clone(),
            repository: self.repository.clone(),
            tag: None,
            digest: Some(digest.into()),
        }
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = self.repository_name();
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

impl std::str::FromStr for ImageReference {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check that a digest is `sha256:` followed by 64 lowercase hex characters.
pub fn is_sha256_digest(digest: &str) -> bool {
    match digest.split_once(':') {
        Some((algorithm, hex)) => {
            algorithm == DIGEST_ALGORITHM
                && hex.len() == SHA256_HEX_LEN
                && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}

/// Normalize registry names ("docker.io" and aliases → "index.docker.io").
pub(crate) fn normalize_registry(registry: &str) -> String {
    let r = registry.trim().to_lowercase();
    if r == "docker.io" || r == "registry-1.docker.io" {
        DOCKER_HUB_REGISTRY.to_string()
    } else {
        r
    }
}

fn invalid(reference: &str, reason: impl std::fmt::Display) -> PinError {
    PinError::InvalidReference(format!("'{}': {}", reference, reason))
}

fn validate_digest(reference: &str, digest: &str) -> Result<()> {
    if !digest.contains(':') {
        return Err(invalid(reference, "expected digest in algorithm:hex form"));
    }
    if !is_sha256_digest(digest) {
        return Err(invalid(
            reference,
            format!("digest must be {}:<{} hex chars>", DIGEST_ALGORITHM, SHA256_HEX_LEN),
        ));
    }
    Ok(())
}

fn validate_tag(reference: &str, tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !first_ok || !rest_ok || tag.len() > MAX_TAG_LEN {
        return Err(invalid(reference, format!("invalid tag '{}'", tag)));
    }
    Ok(())
}

fn validate_registry(reference: &str, registry: &str) -> Result<()> {
    let ok = !registry.is_empty()
        && registry
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'));
    if !ok {
        return Err(invalid(reference, format!("invalid registry '{}'", registry)));
    }
    Ok(())
}

fn validate_repository(reference: &str, repository: &str) -> Result<()> {
    if repository.is_empty() {
        return Err(invalid(reference, "empty repository"));
    }
    if repository.len() > MAX_REPOSITORY_LEN {
        return Err(invalid(reference, "repository name too long"));
    }
    for component in repository.split('/') {
        let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
        let ok = component.chars().next().map_or(false, is_alnum)
            && component.chars().last().map_or(false, is_alnum)
            && component
                .chars()
                .all(|c| is_alnum(c) || matches!(c, '.' | '_' | '-'));
        if !ok {
            return Err(invalid(
                reference,
                format!("invalid repository component '{}'", component),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str =
        "sha256:469b6e04ee185740477efa44ed5bdd64a07bbdd6c7e5f5d169e540889597b911";

    #[test]
    fn test_parse_simple_name() {
        let r = ImageReference::parse("nginx").unwrap();
        assert_eq!(r.registry, "index.docker.io");
        assert_eq!(r.repository, "library/nginx");
        assert_eq!(r.tag, Some("latest".to_string()));
        assert_eq!(r.digest, None);
    }

    #[test]
    fn test_parse_name_with_tag() {
        let r = ImageReference::parse("alpine:3.13").unwrap();
        assert_eq!(r.registry, "index.docker.io");
        assert_eq!(r.repository, "library/alpine");
        assert_eq!(r.tag, Some("3.13".to_string()));
    }

    #[test]
    fn test_parse_numeric_tag() {
        let r = ImageReference::parse("alpine:3").unwrap();
        assert_eq!(r.repository, "library/alpine");
        assert_eq!(r.tag, Some("3".to_string()));
    }

    #[test]
    fn test_parse_user_repo_with_tag() {
        let r = ImageReference::parse("myuser/myimage:v1.0").unwrap();
        assert_eq!(r.registry, "index.docker.io");
        assert_eq!(r.repository, "myuser/myimage");
        assert_eq!(r.tag, Some("v1.0".to_string()));
    }

    #[test]
    fn test_parse_docker_io_alias() {
        let r = ImageReference::parse("docker.io/golang:latest").unwrap();
        assert_eq!(r.registry, "index.docker.io");
        assert_eq!(r.repository, "library/golang");
    }

    #[test]
    fn test_parse_custom_registry() {
        let r = ImageReference::parse("ghcr.io/org/sub/image:v1").unwrap();
        assert_eq!(r.registry, "ghcr.io");
        assert_eq!(r.repository, "org/sub/image");
        assert_eq!(r.tag, Some("v1".to_string()));
    }

    #[test]
    fn test_parse_registry_with_port() {
        let r = ImageReference::parse("localhost:5000/myimage").unwrap();
        assert_eq!(r.registry, "localhost:5000");
        assert_eq!(r.repository, "myimage");
        assert_eq!(r.tag, Some("latest".to_string()));
    }

    #[test]
    fn test_parse_digest_only() {
        let r = ImageReference::parse(&format!("alpine@{}", DIGEST)).unwrap();
        assert_eq!(r.repository, "library/alpine");
        assert_eq!(r.tag, None);
        assert_eq!(r.digest.as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_parse_tag_and_digest() {
        let r = ImageReference::parse(&format!("ghcr.io/org/app:v2@{}", DIGEST)).unwrap();
        assert_eq!(r.tag, Some("v2".to_string()));
        assert_eq!(r.digest.as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_parse_rejects_placeholders() {
        assert!(ImageReference::parse("alpine:$(TAG)").is_err());
        assert!(ImageReference::parse("$(IMAGE)").is_err());
        assert!(ImageReference::parse("${BASE_IMAGE}").is_err());
        assert!(ImageReference::parse("--platform=linux/amd64").is_err());
    }

    #[test]
    fn test_parse_rejects_uppercase_repository() {
        assert!(ImageReference::parse("Alpine:3.13").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_digest() {
        assert!(ImageReference::parse("nginx@invaliddigest").is_err());
        assert!(ImageReference::parse("nginx@sha256:abc123").is_err());
        assert!(ImageReference::parse("nginx@md5:d41d8cd98f00b204e9800998ecf8427e").is_err());
    }

    #[test]
    fn test_parse_empty_reference() {
        assert!(ImageReference::parse("").is_err());
        assert!(ImageReference::parse("   ").is_err());
    }

    #[test]
    fn test_parse_rejects_overlong_tag() {
        let reference = format!("alpine:{}", "a".repeat(129));
        assert!(ImageReference::parse(&reference).is_err());
    }

    #[test]
    fn test_pinned_drops_tag() {
        let r = ImageReference::parse("alpine:3.13").unwrap();
        let pinned = r.pinned(DIGEST);
        assert_eq!(
            pinned.to_string(),
            format!("index.docker.io/library/alpine@{}", DIGEST)
        );
    }

    #[test]
    fn test_display() {
        let r: ImageReference = "nginx:1.25".parse().unwrap();
        assert_eq!(format!("{}", r), "index.docker.io/library/nginx:1.25");
        assert_eq!(r.repository_name(), "index.docker.io/library/nginx");
    }

    #[test]
    fn test_is_sha256_digest() {
        assert!(is_sha256_digest(DIGEST));
        assert!(!is_sha256_digest("sha256:xyz"));
        assert!(!is_sha256_digest("sha512:abc"));
        assert!(!is_sha256_digest("nodigest"));
        assert!(!is_sha256_digest(&DIGEST.to_uppercase().replace("SHA256", "sha256")));
    }

    #[test]
    fn test_parse_rejects_uppercase_digest() {
        let upper = format!("sha256:{}", "A".repeat(64));
        assert!(ImageReference::parse(&format!("alpine@{}", upper)).is_err());
    }
}
