//! Client records.

use crate::db::error::{DbError, DbResult};
use crate::db::DocId;
use std::collections::HashMap;
use tessera_protocol::{Checkpoint, ClientId};

/// Whether a client currently follows a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// The client syncs the document.
    Attached,
    /// The client stopped syncing the document.
    Detached,
}

/// What a client knows about one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientDocInfo {
    /// Attachment status.
    pub status: DocumentStatus,
    /// Checkpoint acknowledged to the client for this document.
    pub checkpoint: Checkpoint,
}

/// Stored state of a client.
///
/// A client holds one checkpoint per attached document. Checkpoints are
/// never shared across documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client ID.
    pub id: ClientId,
    /// Key the client registered with.
    pub key: String,
    documents: HashMap<DocId, ClientDocInfo>,
}

impl ClientInfo {
    /// Creates a client that has attached no document.
    pub fn new(id: ClientId, key: impl Into<String>) -> Self {
        Self {
            id,
            key: key.into(),
            documents: HashMap::new(),
        }
    }

    /// Attaches a document, starting from the initial checkpoint.
    ///
    /// Re-attaching a detached document starts over from the initial
    /// checkpoint as well.
    pub fn attach_document(&mut self, doc_id: DocId) {
        self.documents.insert(
            doc_id,
            ClientDocInfo {
                status: DocumentStatus::Attached,
                checkpoint: Checkpoint::INITIAL,
            },
        );
    }

    /// Detaches a document.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DocumentNotAttached`] if the document is not
    /// attached.
    pub fn detach_document(&mut self, doc_id: DocId) -> DbResult<()> {
        self.ensure_document_attached(doc_id)?;
        if let Some(info) = self.documents.get_mut(&doc_id) {
            info.status = DocumentStatus::Detached;
        }
        Ok(())
    }

    /// Returns true if the document is attached.
    pub fn is_attached(&self, doc_id: DocId) -> bool {
        self.documents
            .get(&doc_id)
            .is_some_and(|info| info.status == DocumentStatus::Attached)
    }

    /// Fails unless the document is attached.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DocumentNotAttached`] if the document is unknown or
    /// detached.
    pub fn ensure_document_attached(&self, doc_id: DocId) -> DbResult<()> {
        if self.is_attached(doc_id) {
            Ok(())
        } else {
            Err(DbError::DocumentNotAttached {
                client: self.id,
                doc: doc_id,
            })
        }
    }

    /// Returns the checkpoint of a document, or the initial checkpoint if the
    /// client never attached it.
    pub fn checkpoint(&self, doc_id: DocId) -> Checkpoint {
        self.documents
            .get(&doc_id)
            .map_or(Checkpoint::INITIAL, |info| info.checkpoint)
    }

    /// Replaces the checkpoint of an attached document.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DocumentNotAttached`] if the document is not
    /// attached.
    pub fn update_checkpoint(&mut self, doc_id: DocId, checkpoint: Checkpoint) -> DbResult<()> {
        self.ensure_document_attached(doc_id)?;
        if let Some(info) = self.documents.get_mut(&doc_id) {
            info.checkpoint = checkpoint;
        }
        Ok(())
    }

    /// Returns what the client knows about a document.
    pub fn document(&self, doc_id: DocId) -> Option<&ClientDocInfo> {
        self.documents.get(&doc_id)
    }

    /// Iterates over every document the client ever attached.
    pub fn documents(&self) -> impl Iterator<Item = (&DocId, &ClientDocInfo)> {
        self.documents.iter()
    }

    /// Stores `info` for a document, as done by a database persisting a
    /// client record.
    pub(crate) fn set_document(&mut self, doc_id: DocId, info: ClientDocInfo) {
        self.documents.insert(doc_id, info);
    }
}
