//! Error taxonomy for store and workflow operations
//!
//! Every fallible operation in the crate returns `StoreResult<T>`. The
//! variants split into caller errors (bad key, duplicate key, invalid
//! payload) and transient server-side failures (lock contention, I/O).
//! The HTTP layer maps them to status codes via the accessors here.

use thiserror::Error;

/// Result alias used throughout the storage and workflow layers
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record, instance, or file does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same filename already exists in the collection
    #[error("duplicate filename: {0}")]
    DuplicateFilename(String),

    /// The payload failed validation before any write was attempted
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The store lock could not be acquired within the bounded wait
    #[error("timed out after {waited_ms}ms waiting for lock on {key}")]
    LockTimeout { key: String, waited_ms: u64 },

    /// Underlying filesystem failure
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Machine-readable code surfaced in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "not_found",
            StoreError::DuplicateFilename(_) => "duplicate_filename",
            StoreError::ValidationFailed(_) => "validation_failed",
            StoreError::LockTimeout { .. } => "lock_timeout",
            StoreError::Io(_) | StoreError::Serialization(_) => "io_failure",
        }
    }

    /// True for errors the caller caused and can fix (4xx class)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_)
                | StoreError::DuplicateFilename(_)
                | StoreError::ValidationFailed(_)
        )
    }

    /// True for transient failures where a retry may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::LockTimeout { .. } | StoreError::Io(_) | StoreError::Serialization(_)
        )
    }

    /// Convenience constructor for a missing record key
    pub fn not_found(filename: &str) -> Self {
        StoreError::NotFound(filename.to_string())
    }

    /// Convenience constructor for a duplicate record key
    pub fn duplicate(filename: &str) -> Self {
        StoreError::DuplicateFilename(filename.to_string())
    }

    /// Convenience constructor for a validation failure
    pub fn validation(reason: impl Into<String>) -> Self {
        StoreError::ValidationFailed(reason.into())
    }
}
