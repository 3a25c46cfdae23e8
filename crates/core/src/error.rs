//! Core Error Types
//!
//! Defines the foundational error types shared across the TabWeave plugin
//! workspace. These error types are dependency-free (only thiserror + std)
//! so that plugin authors depending on the contract crate pull in almost
//! nothing.
//!
//! The runtime crate extends these with additional variants (persistence,
//! module resolution) that require heavier dependencies.

use thiserror::Error;

/// Core error type for the TabWeave plugin workspace.
///
/// This is the minimal error set the contract crate needs. The runtime
/// crate defines additional variants for storage and module handling.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A plugin or module violated its declared contract
    #[error("Contract error: {0}")]
    Contract(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A plugin capability call failed
    #[error("Capability error: {0}")]
    Capability(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a contract error
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Create a capability error
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
