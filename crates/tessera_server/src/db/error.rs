//! Error types for the storage layer.

use crate::context::Cancelled;
use crate::db::DocId;
use tessera_document::DocumentError;
use tessera_protocol::{ClientId, ProtocolError};
use thiserror::Error;

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors raised by a [`Database`](crate::db::Database).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    /// No document with this ID exists.
    #[error("document not found: {0}")]
    DocumentNotFound(DocId),

    /// No client with this ID exists.
    #[error("client not found: {0}")]
    ClientNotFound(ClientId),

    /// The client has not attached the document.
    #[error("document {doc} is not attached to client {client}")]
    DocumentNotAttached {
        /// Client ID.
        client: ClientId,
        /// Document ID.
        doc: DocId,
    },

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A record could not be converted to or from protocol values.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A document could not be encoded for storage.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// The request was cancelled.
    #[error("operation cancelled")]
    Cancelled,
}

impl From<Cancelled> for DbError {
    fn from(_: Cancelled) -> Self {
        DbError::Cancelled
    }
}

impl DbError {
    /// Returns true if a record the caller asked for does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DbError::DocumentNotFound(_) | DbError::ClientNotFound(_)
        )
    }
}
