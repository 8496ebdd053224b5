//! Document records.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_protocol::DocKey;
use uuid::Uuid;

/// Unique identifier for a stored document.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocId([u8; 16]);

impl DocId {
    /// Creates a document ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Creates a new random document ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocId({})", self.to_uuid())
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid())
    }
}

/// Stored metadata of a document.
///
/// The server sequence is the document's monotonic change counter. It is the
/// only value shared between concurrent push-pull cycles of one document, and
/// [`DocInfo::increase_server_seq`] is its only mutator.
#[derive(Debug)]
pub struct DocInfo {
    /// Document ID.
    pub id: DocId,
    /// Document key.
    pub key: DocKey,
    /// `collection$document` form of the key, used in logs.
    pub combined_key: String,
    server_seq: AtomicU64,
}

impl DocInfo {
    /// Creates the record of a new document with no changes.
    pub fn new(id: DocId, key: DocKey) -> Self {
        Self::with_server_seq(id, key, 0)
    }

    /// Creates a record whose counter already reached `server_seq`.
    pub fn with_server_seq(id: DocId, key: DocKey, server_seq: u64) -> Self {
        let combined_key = key.combined_key();
        Self {
            id,
            key,
            combined_key,
            server_seq: AtomicU64::new(server_seq),
        }
    }

    /// Returns the last assigned server sequence.
    pub fn server_seq(&self) -> u64 {
        self.server_seq.load(Ordering::SeqCst)
    }

    /// Assigns the next server sequence and returns it.
    ///
    /// Concurrent callers never receive the same number and the counter never
    /// moves backward. A number is consumed even if the change it was
    /// assigned to is never persisted.
    pub fn increase_server_seq(&self) -> u64 {
        self.server_seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}
