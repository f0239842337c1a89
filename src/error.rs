//! Error types for AtlasORM
//!
//! Provides a unified error type for all table, index and query operations.

use thiserror::Error;

/// Result type alias using OrmError
pub type Result<T> = std::result::Result<T, OrmError>;

/// Unified error type for AtlasORM operations
#[derive(Debug, Error)]
pub enum OrmError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Lookup / Constraint Errors (recoverable)
    // -------------------------------------------------------------------------
    #[error("Not found")]
    NotFound,

    #[error("Unique constraint violation: {0}")]
    UniqueConstraint(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Returned by `RowIterator::load_next` once a range is consumed.
    #[error("Iterator done")]
    IteratorDone,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrmError {
    /// True for the error kinds a caller is expected to handle
    /// (missing rows, constraint and argument violations).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            OrmError::NotFound
                | OrmError::UniqueConstraint(_)
                | OrmError::InvalidArgument(_)
                | OrmError::TypeMismatch(_)
                | OrmError::IteratorDone
        )
    }
}
