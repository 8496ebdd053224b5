//! Stored changes.

use crate::db::DocId;
use tessera_protocol::{Change, ChangeId, ClientId, Operation, ProtocolError, ProtocolResult};

/// A change as persisted by the server, keyed by document and server
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeInfo {
    /// Document the change belongs to.
    pub doc_id: DocId,
    /// Server sequence assigned by the push stage.
    pub server_seq: u64,
    /// Client sequence assigned by the author.
    pub client_seq: u64,
    /// Lamport clock of the change.
    pub lamport: u64,
    /// Author of the change.
    pub actor: ClientId,
    /// Optional message.
    pub message: Option<String>,
    /// Operations in authoring order.
    pub operations: Vec<Operation>,
}

impl ChangeInfo {
    /// Builds the record of an accepted change.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ChangeNotStamped`] if the change carries no
    /// server sequence.
    pub fn from_change(doc_id: DocId, change: &Change) -> ProtocolResult<Self> {
        let id = change.id();
        let server_seq = change
            .server_seq()
            .ok_or_else(|| ProtocolError::ChangeNotStamped {
                client_seq: id.client_seq,
                actor: id.actor.to_string(),
            })?;

        Ok(Self {
            doc_id,
            server_seq,
            client_seq: id.client_seq,
            lamport: id.lamport,
            actor: id.actor,
            message: change.message().map(str::to_owned),
            operations: change.operations().to_vec(),
        })
    }

    /// Converts the record back to a stamped change.
    pub fn to_change(&self) -> Change {
        Change::stored(
            ChangeId::new(self.client_seq, self.lamport, self.actor),
            self.server_seq,
            self.operations.clone(),
            self.message.clone(),
        )
    }
}
