//! Error types for DRF scheduling

use thiserror::Error;

/// Main error type for the DRF policy and its scheduler harness
#[derive(Error, Debug)]
pub enum DrfError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource vector violates its invariants
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Consumer not found
    #[error("Consumer not found: {0}")]
    ConsumerNotFound(String),

    /// Consumer already registered
    #[error("Consumer already exists: {0}")]
    ConsumerExists(String),

    /// Consumer still holds resources
    #[error("Consumer busy: {0}")]
    ConsumerBusy(String),

    /// Release larger than what the consumer holds
    #[error("Insufficient usage: {0}")]
    InsufficientUsage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for DRF operations
pub type DrfResult<T> = Result<T, DrfError>;

impl From<serde_json::Error> for DrfError {
    fn from(err: serde_json::Error) -> Self {
        DrfError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DrfError {
    fn from(err: toml::de::Error) -> Self {
        DrfError::Config(err.to_string())
    }
}
