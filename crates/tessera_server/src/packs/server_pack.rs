//! Response of a push-pull cycle.

use crate::db::ChangeInfo;
use bytes::Bytes;
use tessera_protocol::{ChangePack, Checkpoint, DocKey};

/// What the pull stage hands back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pulled {
    /// Changes the client is missing, in ascending server-sequence order.
    Changes(Vec<ChangeInfo>),
    /// Serialized document state replacing the client's root.
    Snapshot(Bytes),
}

/// Server-side response pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPack {
    /// Key of the document.
    pub doc_key: DocKey,
    /// Checkpoint the client moves to.
    pub checkpoint: Checkpoint,
    /// Pulled changes or snapshot.
    pub pulled: Pulled,
}

impl ServerPack {
    /// Creates a response carrying changes.
    pub fn with_changes(doc_key: DocKey, checkpoint: Checkpoint, changes: Vec<ChangeInfo>) -> Self {
        Self {
            doc_key,
            checkpoint,
            pulled: Pulled::Changes(changes),
        }
    }

    /// Creates a response carrying a snapshot.
    pub fn with_snapshot(doc_key: DocKey, checkpoint: Checkpoint, snapshot: Bytes) -> Self {
        Self {
            doc_key,
            checkpoint,
            pulled: Pulled::Snapshot(snapshot),
        }
    }

    /// Returns the pulled changes; empty for a snapshot response.
    pub fn changes(&self) -> &[ChangeInfo] {
        match &self.pulled {
            Pulled::Changes(changes) => changes,
            Pulled::Snapshot(_) => &[],
        }
    }

    /// Returns the snapshot, if this is a snapshot response.
    pub fn snapshot(&self) -> Option<&Bytes> {
        match &self.pulled {
            Pulled::Snapshot(snapshot) => Some(snapshot),
            Pulled::Changes(_) => None,
        }
    }

    /// Returns true if this is a snapshot response.
    pub fn is_snapshot(&self) -> bool {
        matches!(self.pulled, Pulled::Snapshot(_))
    }

    /// Returns the number of pulled changes.
    pub fn changes_len(&self) -> usize {
        self.changes().len()
    }

    /// Converts to the protocol pack sent to the client.
    pub fn into_change_pack(self) -> ChangePack {
        let (changes, snapshot) = match self.pulled {
            Pulled::Changes(infos) => (infos.iter().map(ChangeInfo::to_change).collect(), None),
            Pulled::Snapshot(snapshot) => (Vec::new(), Some(snapshot)),
        };
        ChangePack::new(self.doc_key, self.checkpoint, changes, snapshot)
    }
}
