//! Error types shared by every VoodooSpark crate.

use thiserror::Error;

/// Message used when an adaptor is built without device credentials.
pub const MISSING_CREDENTIALS: &str =
    "No deviceId and/or accessToken provided for VoodooSpark adaptor. Cannot proceed";

/// Result type for adaptor operations.
pub type Result<T> = std::result::Result<T, AdaptorError>;

/// Error type for adaptor and device client operations.
#[derive(Debug, Error)]
pub enum AdaptorError {
    /// Adaptor configuration error (raised at construction)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The device could not be reached or never signalled readiness
    #[error("Connection error: {0}")]
    Connection(String),

    /// A read, write or mode-set reported by the device client as failed
    #[error("Operation error: {0}")]
    Operation(String),

    /// A pin operation was issued before `connect` completed
    #[error("Adaptor is not connected")]
    NotConnected,

    /// A caller-supplied value cannot be scaled
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// The device client does not provide this capability
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Operation timeout
    #[error("Operation timeout after {0}ms")]
    Timeout(u64),

    /// Other error
    #[error("Adaptor error: {0}")]
    Other(#[from] anyhow::Error),
}

impl AdaptorError {
    /// The error raised when credentials are missing or empty.
    pub fn missing_credentials() -> Self {
        Self::Configuration(MISSING_CREDENTIALS.to_string())
    }

    /// Whether this error was produced before any network activity.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}
