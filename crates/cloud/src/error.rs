//! Error types for collaborator ports.

use thiserror::Error;

/// Errors surfaced by the infrastructure ports.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// An operation's internal wait-until-complete step exceeded its
    /// budget. Distinct from a generic API failure so callers can raise
    /// the timeout-specific error subtype.
    #[error("Timed out waiting for {operation}")]
    WaitTimeout { operation: String },

    #[error("API error: {0}")]
    Api(String),
}

/// Result type for infrastructure port operations.
pub type CloudResult<T> = std::result::Result<T, CloudError>;

/// Errors surfaced by the config/secret store port.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Parameter not found: {0}")]
    NotFound(String),

    #[error("Document not found: {bucket}/{key}")]
    DocumentNotFound { bucket: String, key: String },

    #[error("Failed to parse {name}: {reason}")]
    Parse { name: String, reason: String },

    #[error("Store error: {0}")]
    Api(String),
}
