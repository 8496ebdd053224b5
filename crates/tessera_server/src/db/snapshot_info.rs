//! Stored snapshots.

use crate::db::DocId;
use bytes::Bytes;

/// Serialized state of a document at a server sequence.
///
/// A snapshot is immutable once written and is superseded by later ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Document the snapshot belongs to.
    pub doc_id: DocId,
    /// Server sequence of the last change folded into the snapshot.
    pub server_seq: u64,
    /// Serialized document root.
    pub snapshot: Bytes,
}

impl SnapshotInfo {
    /// Creates a snapshot record.
    pub fn new(doc_id: DocId, server_seq: u64, snapshot: Bytes) -> Self {
        Self {
            doc_id,
            server_seq,
            snapshot,
        }
    }

    /// Returns the empty snapshot at server sequence 0, used when a document
    /// has never been snapshotted.
    pub fn initial(doc_id: DocId) -> Self {
        Self::new(doc_id, 0, Bytes::new())
    }

    /// Returns true if this is the empty initial snapshot.
    pub fn is_initial(&self) -> bool {
        self.server_seq == 0 && self.snapshot.is_empty()
    }
}
