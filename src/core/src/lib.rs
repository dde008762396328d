//! A3S Pin Core - shared types for Dockerfile digest pinning.
//!
//! Holds the error type and configuration used by the resolver and CLI crates.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{LogLevel, PinConfig, Platform, RegistryConfig};
pub use error::{PinError, Result};

/// A3S Pin version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
