//! Error types for protocol values.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while building or converting protocol values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A combined document key could not be split into its parts.
    #[error("invalid document key: {0:?}")]
    InvalidDocKey(String),

    /// A change was expected to carry a server sequence but has none.
    #[error("change {client_seq} of client {actor} has no server sequence")]
    ChangeNotStamped {
        /// Client sequence of the change.
        client_seq: u64,
        /// Author of the change.
        actor: String,
    },
}
