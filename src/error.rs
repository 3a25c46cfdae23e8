//! Runtime Error Types
//!
//! Error type for the runtime crate, layered on top of
//! [`CoreError`](tabweave_core::CoreError) the way the contract crate's
//! errors stay dependency-light: persistence and module-resolution variants
//! live here, contract-level variants convert in via `#[from]`.

use thiserror::Error;

/// Runtime error type.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Contract-layer errors bubbling out of plugin or module code
    #[error(transparent)]
    Core(#[from] tabweave_core::CoreError),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A module could not be resolved or scanned
    #[error("Module error: {0}")]
    Module(String),

    /// Persisted state could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for runtime errors
pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    /// Create a module error
    pub fn module(msg: impl Into<String>) -> Self {
        Self::Module(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
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

/// Convert RuntimeError to a string
impl From<RuntimeError> for String {
    fn from(err: RuntimeError) -> String {
        err.to_string()
    }
}
