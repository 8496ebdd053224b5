//! Error types for document operations.

use thiserror::Error;

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors that can occur while loading, editing or serializing a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Snapshot bytes could not be decoded.
    #[error("snapshot decoding failed: {0}")]
    Snapshot(String),

    /// The root could not be encoded.
    #[error("snapshot encoding failed: {0}")]
    Serialize(String),

    /// A change pack addressed another document.
    #[error("change pack for {actual} applied to {expected}")]
    KeyMismatch {
        /// Key of the document.
        expected: String,
        /// Key carried by the pack.
        actual: String,
    },

    /// An operation is malformed.
    #[error("invalid operation in change {client_seq}: {reason}")]
    InvalidOperation {
        /// Client sequence of the offending change.
        client_seq: u64,
        /// What is wrong with it.
        reason: String,
    },
}
