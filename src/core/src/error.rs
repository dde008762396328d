use thiserror::Error;

/// A3S Pin error types
#[derive(Error, Debug)]
pub enum PinError {
    /// Image reference could not be parsed
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    /// Container registry error
    #[error("Registry error: {registry} - {message}")]
    RegistryError { registry: String, message: String },

    /// A resolvable reference in a Dockerfile could not be pinned
    #[error("Failed to resolve '{reference}' on line {line}: {source}")]
    ResolveError {
        reference: String,
        line: usize,
        #[source]
        source: Box<PinError>,
    },

    /// Credential store error
    #[error("Credential error: {0}")]
    CredentialError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for PinError {
    fn from(err: serde_json::Error) -> Self {
        PinError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for PinError {
    fn from(err: serde_yaml::Error) -> Self {
        PinError::SerializationError(err.to_string())
    }
}

/// Result type alias for A3S Pin operations
pub type Result<T> = std::result::Result<T, PinError>;
