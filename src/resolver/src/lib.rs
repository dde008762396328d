//! A3S Pin Resolver - pins Dockerfile base images to content digests.
//!
//! - [`oci`]: image reference parsing, registry lookups and stored credentials
//! - [`digest`]: the [`DigestResolver`] seam the rewriter depends on
//! - [`dockerfile`]: the line-oriented rewriter

#![allow(clippy::result_large_err)]

pub mod digest;
pub mod dockerfile;
pub mod oci;

// Re-export common types
pub use digest::DigestResolver;
pub use dockerfile::{resolve_dockerfile, DockerfilePinner, Line, Rewrite, RewriteSummary};
pub use oci::{CredentialStore, ImageReference, RegistryAuth, RegistryResolver};
