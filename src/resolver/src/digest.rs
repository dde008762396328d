//! Digest resolver abstraction.

use async_trait::async_trait;

use a3s_pin_core::error::Result;

use crate::oci::ImageReference;

/// Maps a tag-based image reference to the digest it currently points at.
///
/// The rewriter only calls this for references that parsed successfully and
/// carry no digest. Implementations return the digest-qualified reference
/// (see [`ImageReference::pinned`]).
#[async_trait]
pub trait DigestResolver: Send + Sync {
    async fn resolve(&self, reference: &ImageReference) -> Result<ImageReference>;
}

