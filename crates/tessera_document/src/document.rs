//! In-memory document.

use crate::error::{DocumentError, DocumentResult};
use crate::root::Root;
use bytes::Bytes;
use tessera_protocol::{
    Change, ChangeId, ChangePack, Checkpoint, ClientId, DocKey, Operation, Primitive,
};

/// Collects the operations of one local change.
#[derive(Debug, Default)]
pub struct ChangeBuilder {
    operations: Vec<Operation>,
    message: Option<String>,
}

impl ChangeBuilder {
    /// Sets `key` to `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Primitive>) -> &mut Self {
        self.operations.push(Operation::set(key, value));
        self
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.operations.push(Operation::remove(key));
        self
    }

    /// Attaches a message to the change.
    pub fn message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }
}

/// A CRDT document held in memory.
///
/// On a client the document authors changes with [`Document::update`], keeps
/// them as local changes until the server acknowledges them, and applies the
/// response pack of each push-pull cycle. On the server a document is built
/// from a stored snapshot and the missing changes are replayed into it.
#[derive(Debug, Clone)]
pub struct Document {
    key: DocKey,
    actor: ClientId,
    change_id: ChangeId,
    checkpoint: Checkpoint,
    root: Root,
    local_changes: Vec<Change>,
}

impl Document {
    /// Creates an empty document edited by `actor`.
    pub fn new(key: DocKey, actor: ClientId) -> Self {
        Self {
            key,
            actor,
            change_id: ChangeId::new(0, 0, actor),
            checkpoint: Checkpoint::INITIAL,
            root: Root::new(),
            local_changes: Vec::new(),
        }
    }

    /// Builds a document from a stored snapshot taken at `server_seq`.
    ///
    /// Empty snapshot bytes yield an empty document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Snapshot`] if the snapshot cannot be decoded.
    pub fn from_snapshot(key: DocKey, server_seq: u64, snapshot: &[u8]) -> DocumentResult<Self> {
        let root = Root::from_bytes(snapshot)?;
        let actor = ClientId::from_bytes([0u8; 16]);
        Ok(Self {
            key,
            actor,
            change_id: ChangeId::new(0, 0, actor),
            checkpoint: Checkpoint::INITIAL.next_server_seq(server_seq),
            root,
            local_changes: Vec::new(),
        })
    }

    /// Returns the document key.
    pub fn key(&self) -> &DocKey {
        &self.key
    }

    /// Returns the actor that authors local changes.
    pub fn actor(&self) -> ClientId {
        self.actor
    }

    /// Returns the checkpoint acknowledged so far.
    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// Returns the root.
    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Returns true if some local changes are not yet acknowledged.
    pub fn has_local_changes(&self) -> bool {
        !self.local_changes.is_empty()
    }

    /// Returns the local changes not yet acknowledged.
    pub fn local_changes(&self) -> &[Change] {
        &self.local_changes
    }

    /// Authors a local change.
    ///
    /// The change is applied to the root immediately and queued until a
    /// response pack acknowledges its client sequence. A builder with no
    /// operations creates no change.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidOperation`] if an operation is malformed;
    /// the document is left untouched.
    pub fn update<F>(&mut self, build: F) -> DocumentResult<()>
    where
        F: FnOnce(&mut ChangeBuilder),
    {
        let mut builder = ChangeBuilder::default();
        build(&mut builder);
        if builder.operations.is_empty() {
            return Ok(());
        }

        let id = ChangeId::new(
            self.change_id.client_seq + 1,
            self.change_id.lamport + 1,
            self.actor,
        );
        let mut change = Change::new(id, builder.operations);
        if let Some(message) = builder.message {
            change = change.with_message(message);
        }
        validate(&change)?;

        self.execute(&change);
        self.change_id = id;
        self.local_changes.push(change);
        Ok(())
    }

    /// Creates the request pack for the next push-pull cycle.
    pub fn create_change_pack(&self) -> ChangePack {
        ChangePack::request(
            self.key.clone(),
            self.checkpoint,
            self.local_changes.clone(),
        )
    }

    /// Applies a change pack.
    ///
    /// A pack with a snapshot replaces the root and re-executes the pending
    /// local changes on top of it. Otherwise its changes are applied in order.
    /// Either way the checkpoint moves forward to the pack's checkpoint and
    /// acknowledged local changes are dropped.
    ///
    /// Every change is validated before anything is applied, so a failing
    /// pack leaves the document as it was.
    ///
    /// # Errors
    ///
    /// Returns an error if the pack addresses another document, the snapshot
    /// cannot be decoded, or a change is malformed.
    pub fn apply_change_pack(&mut self, pack: &ChangePack) -> DocumentResult<()> {
        if pack.doc_key != self.key {
            return Err(DocumentError::KeyMismatch {
                expected: self.key.combined_key(),
                actual: pack.doc_key.combined_key(),
            });
        }

        match &pack.snapshot {
            Some(snapshot) if !snapshot.is_empty() => {
                let mut root = Root::from_bytes(snapshot)?;
                for change in &self.local_changes {
                    apply_to(&mut root, change);
                }
                let lamport = root.max_lamport().max(self.change_id.lamport);
                self.change_id = ChangeId::new(self.change_id.client_seq, lamport, self.actor);
                self.root = root;
            }
            _ => {
                for change in &pack.changes {
                    validate(change)?;
                }
                for change in &pack.changes {
                    self.execute(change);
                }
            }
        }

        self.checkpoint = self.checkpoint.forward(pack.checkpoint);
        let acked = pack.checkpoint.client_seq;
        self.local_changes.retain(|c| c.client_seq() > acked);
        Ok(())
    }

    /// Serializes the root to snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] if encoding fails.
    pub fn serialize_root_to_bytes(&self) -> DocumentResult<Bytes> {
        self.root.to_bytes()
    }

    /// Renders the live root as JSON.
    pub fn marshal(&self) -> String {
        self.root.marshal()
    }

    /// Returns the number of tracked root elements, tombstones included.
    pub fn element_map_len(&self) -> usize {
        self.root.element_map_len()
    }

    /// Returns the number of tombstones in the root.
    pub fn removed_element_len(&self) -> usize {
        self.root.removed_element_len()
    }

    fn execute(&mut self, change: &Change) {
        let lamport = change.id().lamport.max(self.change_id.lamport);
        self.change_id = ChangeId::new(self.change_id.client_seq, lamport, self.actor);
        apply_to(&mut self.root, change);
    }
}

fn apply_to(root: &mut Root, change: &Change) {
    for (delimiter, operation) in change.operations().iter().enumerate() {
        root.apply(operation, change.id().ticket(delimiter as u32));
    }
}

fn validate(change: &Change) -> DocumentResult<()> {
    if change.operations().iter().any(|op| op.key().is_empty()) {
        return Err(DocumentError::InvalidOperation {
            client_seq: change.client_seq(),
            reason: "empty key".into(),
        });
    }
    Ok(())
}
