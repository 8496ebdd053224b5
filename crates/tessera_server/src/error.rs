//! Error types for the sync core.

use crate::context::Cancelled;
use crate::db::DbError;
use tessera_document::DocumentError;
use thiserror::Error;

/// Result type for sync operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur during a push-pull cycle.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The client claims to have seen changes the document does not have.
    #[error("invalid server seq: document is at {initial}, client requested from {requested}")]
    InvalidServerSeq {
        /// Server sequence of the document when the cycle started.
        initial: u64,
        /// Server sequence in the client's checkpoint.
        requested: u64,
    },

    /// Storage error.
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Reading a range of changes failed.
    #[error("failed to read changes {from}..={to} of '{doc_key}': {source}")]
    ReadChanges {
        /// Combined key of the document.
        doc_key: String,
        /// First server sequence of the range.
        from: u64,
        /// Last server sequence of the range.
        to: u64,
        /// Underlying storage error.
        #[source]
        source: DbError,
    },

    /// Reading the last stored snapshot failed.
    #[error("failed to read last snapshot of '{doc_key}': {source}")]
    ReadSnapshot {
        /// Combined key of the document.
        doc_key: String,
        /// Underlying storage error.
        #[source]
        source: DbError,
    },

    /// Loading a snapshot or replaying changes into it failed.
    #[error("failed to rebuild '{doc_key}' at server seq {server_seq}: {source}")]
    Reconstruction {
        /// Combined key of the document.
        doc_key: String,
        /// Server sequence being rebuilt.
        server_seq: u64,
        /// Underlying document error.
        #[source]
        source: DocumentError,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The request was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<Cancelled> for ServerError {
    fn from(_: Cancelled) -> Self {
        ServerError::Cancelled
    }
}

impl ServerError {
    /// Returns true if the request itself is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::InvalidServerSeq { .. }
                | ServerError::Database(
                    DbError::DocumentNotAttached { .. }
                        | DbError::DocumentNotFound(_)
                        | DbError::ClientNotFound(_)
                )
        )
    }

    /// Returns true if the request was cancelled, at any layer.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ServerError::Cancelled
                | ServerError::Database(DbError::Cancelled)
                | ServerError::ReadChanges {
                    source: DbError::Cancelled,
                    ..
                }
                | ServerError::ReadSnapshot {
                    source: DbError::Cancelled,
                    ..
                }
        )
    }

    /// Returns true if the caller may retry the request as is.
    ///
    /// Failed reads and cancellations are retryable. The core never retries
    /// on its own.
    pub fn is_retryable(&self) -> bool {
        self.is_cancelled()
            || matches!(
                self,
                ServerError::ReadChanges {
                    source: DbError::Storage(_),
                    ..
                } | ServerError::ReadSnapshot {
                    source: DbError::Storage(_),
                    ..
                }
            )
    }
}
