//! Error types for BreedLens

/// Result type alias using BreedLens's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for BreedLens operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No credential available before any inference attempt
    #[error("no inference credential available")]
    MissingCredential,

    /// Secondary or primary model call failed (network, auth, quota, timeout)
    #[error("inference unavailable: {0}")]
    InferenceUnavailable(String),

    /// Uploaded bytes are not a valid image
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new inference-unavailable error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::InferenceUnavailable(msg.into())
    }

    /// Create a new decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error blocks the pipeline before any network call
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::Decode(_))
    }
}
