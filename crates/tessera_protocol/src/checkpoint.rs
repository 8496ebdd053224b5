//! Client/server sequence watermarks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much of a document's history a client and the server have both
/// acknowledged.
///
/// A checkpoint pairs two independently advancing counters:
/// - `server_seq`: the last server sequence the client has received
/// - `client_seq`: the last client sequence the server has received
///
/// # Invariants
///
/// - Neither field ever decreases over the lifetime of a client/document
///   attachment.
/// - Transforms never mutate in place; each returns a new checkpoint.
///
/// Checkpoints compare lexicographically by `(server_seq, client_seq)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Checkpoint {
    /// Last server sequence acknowledged by the client.
    pub server_seq: u64,
    /// Last client sequence acknowledged by the server.
    pub client_seq: u64,
}

impl Checkpoint {
    /// The checkpoint of a client that has exchanged nothing yet.
    pub const INITIAL: Checkpoint = Checkpoint {
        server_seq: 0,
        client_seq: 0,
    };

    /// Creates a checkpoint from its two sequences.
    #[must_use]
    pub const fn new(server_seq: u64, client_seq: u64) -> Self {
        Self {
            server_seq,
            client_seq,
        }
    }

    /// Returns a copy advanced to the given server sequence.
    ///
    /// The server sequence never moves backward: a `seq` below the current
    /// one leaves it unchanged.
    #[must_use]
    pub fn next_server_seq(self, seq: u64) -> Self {
        if seq <= self.server_seq {
            return self;
        }
        Self {
            server_seq: seq,
            ..self
        }
    }

    /// Returns a copy whose client sequence covers `seq`.
    #[must_use]
    pub fn sync_client_seq(self, seq: u64) -> Self {
        Self {
            client_seq: self.client_seq.max(seq),
            ..self
        }
    }

    /// Returns the field-wise maximum of two checkpoints.
    #[must_use]
    pub fn forward(self, other: Checkpoint) -> Self {
        Self {
            server_seq: self.server_seq.max(other.server_seq),
            client_seq: self.client_seq.max(other.client_seq),
        }
    }

    /// Returns true if this is the initial checkpoint.
    pub fn is_initial(&self) -> bool {
        *self == Self::INITIAL
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "serverSeq={}, clientSeq={}",
            self.server_seq, self.client_seq
        )
    }
}
