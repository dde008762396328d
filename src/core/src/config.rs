use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PinError, Result};

/// Pin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// Registry access settings
    pub registry: RegistryConfig,

    /// Log level used when `RUST_LOG` is not set
    pub log_level: LogLevel,

    /// Resolve each distinct reference only once per Dockerfile
    pub memoize: bool,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            log_level: LogLevel::Warn,
            memoize: true,
        }
    }
}

impl PinConfig {
    /// Default config location (`~/.a3s/pin/config.yaml`).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".a3s"))
            .unwrap_or_else(|| PathBuf::from(".a3s"))
            .join("pin")
            .join("config.yaml")
    }

    /// Load configuration from a YAML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|e| {
            PinError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: PinConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }
}

/// Registry access configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registries reached over plain HTTP (e.g. "localhost:5000")
    pub insecure_registries: Vec<String>,

    /// Pin the platform-specific manifest instead of the image index
    pub platform: Option<Platform>,
}

/// Target platform of a multi-arch image (`os/arch[/variant]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    pub variant: Option<String>,
}

impl std::str::FromStr for Platform {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        let has_empty = parts.iter().any(|p| p.is_empty());
        match parts.as_slice() {
            [os, arch] if !has_empty => Ok(Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: None,
            }),
            [os, arch, variant] if !has_empty => Ok(Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: Some(variant.to_string()),
            }),
            _ => Err(PinError::ConfigError(format!(
                "Invalid platform '{}': expected os/arch[/variant]",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Platform {
    type Error = PinError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.to_string()
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(ref variant) = self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
