//! Error types for studypack core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; a host application maps
//! these to user-facing messages.

use thiserror::Error;

/// Result type alias for studypack operations.
pub type Result<T> = std::result::Result<T, StudypackError>;

/// Core error type for studypack operations.
#[derive(Debug, Error)]
pub enum StudypackError {
    /// The byte stream is not a readable archive, or the archive
    /// violates its structural invariants.
    #[error("Malformed archive: {0}")]
    MalformedArchive(String),

    /// The manifest descriptor is missing, unparseable, or incomplete.
    /// Fatal to the whole load operation.
    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    /// The database member is not a valid SQLite file or lacks the
    /// required tables.
    #[error("Corrupt database: {0}")]
    CorruptDatabase(String),

    /// Constraint violation or syntax failure during a specific operation,
    /// carrying the underlying engine's message.
    #[error("Query failed: {0}")]
    Query(String),

    /// Referenced note or tag does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O-level failure while producing bytes.
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// A merge batch failed; the whole transaction was rolled back.
    #[error("Merge failed for note {index} ('{title}'): {reason}")]
    Merge {
        /// Zero-based position of the failing note in the batch.
        index: usize,
        /// Title of the failing note, for host-side reporting.
        title: String,
        /// Message of the underlying failure.
        reason: String,
    },
}

impl From<rusqlite::Error> for StudypackError {
    fn from(err: rusqlite::Error) -> Self {
        StudypackError::Query(err.to_string())
    }
}

impl From<std::io::Error> for StudypackError {
    fn from(err: std::io::Error) -> Self {
        StudypackError::Encoding(err.to_string())
    }
}
