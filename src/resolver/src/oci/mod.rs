//! OCI registry support for digest pinning.
//!
//! ```text
//!   "alpine:3.13"
//!        │ ImageReference::parse
//!        ▼
//!   index.docker.io/library/alpine:3.13
//!        │ RegistryResolver (manifest lookup, credentials from CredentialStore)
//!        ▼
//!   index.docker.io/library/alpine@sha256:469b6e04…
//! ```

pub mod credentials;
pub mod reference;
pub mod registry;

pub use credentials::CredentialStore;
pub use reference::ImageReference;
pub use registry::{RegistryAuth, RegistryResolver};
