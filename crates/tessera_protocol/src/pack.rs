//! Change packs exchanged in a push-pull cycle.

use crate::change::Change;
use crate::checkpoint::Checkpoint;
use crate::ids::DocKey;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A batch of ordered changes plus the checkpoint they were produced or
/// requested under.
///
/// A request pack carries the client's believed checkpoint and its new local
/// changes. A response pack carries the updated checkpoint and either pulled
/// changes or a snapshot, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePack {
    /// Key of the document.
    pub doc_key: DocKey,
    /// Checkpoint of the sender.
    pub checkpoint: Checkpoint,
    /// Changes in client-sequence (request) or server-sequence (response) order.
    pub changes: Vec<Change>,
    /// Serialized document state, for snapshot responses.
    pub snapshot: Option<Bytes>,
}

impl ChangePack {
    /// Creates a pack.
    pub fn new(
        doc_key: DocKey,
        checkpoint: Checkpoint,
        changes: Vec<Change>,
        snapshot: Option<Bytes>,
    ) -> Self {
        Self {
            doc_key,
            checkpoint,
            changes,
            snapshot,
        }
    }

    /// Creates a request pack carrying local changes.
    pub fn request(doc_key: DocKey, checkpoint: Checkpoint, changes: Vec<Change>) -> Self {
        Self::new(doc_key, checkpoint, changes, None)
    }

    /// Returns true if the pack carries a non-empty snapshot.
    pub fn has_snapshot(&self) -> bool {
        self.snapshot.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Returns the number of changes.
    pub fn changes_len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if the pack carries neither changes nor a snapshot.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && !self.has_snapshot()
    }
}
