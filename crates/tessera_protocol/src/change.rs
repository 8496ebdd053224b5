//! Changes and their identifiers.

use crate::ids::ClientId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical timestamp of a single operation.
///
/// Tickets are totally ordered by `(lamport, actor, delimiter)`, which lets
/// every replica pick the same winner between concurrent writes regardless
/// of the order it receives them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeTicket {
    /// Lamport clock of the change that issued the ticket.
    pub lamport: u64,
    /// Author of the change.
    pub actor: ClientId,
    /// Position of the operation inside its change.
    pub delimiter: u32,
}

impl TimeTicket {
    /// Creates a ticket.
    #[must_use]
    pub const fn new(lamport: u64, delimiter: u32, actor: ClientId) -> Self {
        Self {
            lamport,
            actor,
            delimiter,
        }
    }
}

impl fmt::Display for TimeTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.lamport, self.actor, self.delimiter)
    }
}

/// Identifier of a change, assigned by its author when the change is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId {
    /// Per-client, per-document sequence number used for deduplication.
    pub client_seq: u64,
    /// Lamport clock at creation.
    pub lamport: u64,
    /// Author of the change.
    pub actor: ClientId,
}

impl ChangeId {
    /// Creates a change ID.
    #[must_use]
    pub const fn new(client_seq: u64, lamport: u64, actor: ClientId) -> Self {
        Self {
            client_seq,
            lamport,
            actor,
        }
    }

    /// Returns the ticket of the operation at `delimiter` within this change.
    #[must_use]
    pub const fn ticket(&self, delimiter: u32) -> TimeTicket {
        TimeTicket::new(self.lamport, delimiter, self.actor)
    }
}

/// A primitive value stored under a key of the document root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Primitive {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Integer(i64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl From<bool> for Primitive {
    fn from(value: bool) -> Self {
        Primitive::Bool(value)
    }
}

impl From<i64> for Primitive {
    fn from(value: i64) -> Self {
        Primitive::Integer(value)
    }
}

impl From<&str> for Primitive {
    fn from(value: &str) -> Self {
        Primitive::Text(value.to_string())
    }
}

impl From<String> for Primitive {
    fn from(value: String) -> Self {
        Primitive::Text(value)
    }
}

impl From<Vec<u8>> for Primitive {
    fn from(value: Vec<u8>) -> Self {
        Primitive::Bytes(value)
    }
}

/// A single edit carried by a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Sets `key` to `value`.
    Set {
        /// Root key.
        key: String,
        /// New value.
        value: Primitive,
    },
    /// Removes `key`.
    Remove {
        /// Root key.
        key: String,
    },
}

impl Operation {
    /// Creates a set operation.
    pub fn set(key: impl Into<String>, value: impl Into<Primitive>) -> Self {
        Operation::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a remove operation.
    pub fn remove(key: impl Into<String>) -> Self {
        Operation::Remove { key: key.into() }
    }

    /// Returns the key this operation targets.
    pub fn key(&self) -> &str {
        match self {
            Operation::Set { key, .. } | Operation::Remove { key } => key,
        }
    }
}

/// One client-authored edit.
///
/// The client sequence inside [`ChangeId`] is fixed at creation. The server
/// sequence is unset until the push stage accepts the change and stamps it;
/// the push stage stamps each accepted change exactly once. Before
/// acceptance changes are ordered by client sequence, afterwards by server
/// sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    id: ChangeId,
    server_seq: Option<u64>,
    operations: Vec<Operation>,
    message: Option<String>,
}

impl Change {
    /// Creates an unstamped change.
    pub fn new(id: ChangeId, operations: Vec<Operation>) -> Self {
        Self {
            id,
            server_seq: None,
            operations,
            message: None,
        }
    }

    /// Creates a change that already carries a server sequence, as read back
    /// from storage.
    pub fn stored(
        id: ChangeId,
        server_seq: u64,
        operations: Vec<Operation>,
        message: Option<String>,
    ) -> Self {
        Self {
            id,
            server_seq: Some(server_seq),
            operations,
            message,
        }
    }

    /// Attaches a human-readable message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Returns a copy stamped with the server sequence assigned by the push
    /// stage.
    ///
    /// The server is authoritative for server sequences: whatever sequence
    /// the sender put on the change is replaced.
    #[must_use]
    pub fn stamped(&self, server_seq: u64) -> Self {
        Self {
            server_seq: Some(server_seq),
            ..self.clone()
        }
    }

    /// Returns the change ID.
    pub fn id(&self) -> &ChangeId {
        &self.id
    }

    /// Returns the client sequence.
    pub fn client_seq(&self) -> u64 {
        self.id.client_seq
    }

    /// Returns the server sequence, if the change has been accepted.
    pub fn server_seq(&self) -> Option<u64> {
        self.server_seq
    }

    /// Returns the operations in authoring order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Returns the message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
