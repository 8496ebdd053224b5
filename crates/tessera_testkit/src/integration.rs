//! Simulated clients for end-to-end tests.
//!
//! A [`SyncClient`] owns a client-side [`Document`] and the server-side
//! record of its client, and syncs by running real push-pull cycles against
//! a [`TestBackend`].

use crate::fixtures::TestBackend;
use std::sync::Arc;
use tessera_document::{ChangeBuilder, Document};
use tessera_protocol::{Checkpoint, Primitive};
use tessera_server::{push_pull, Backend, ClientInfo, Context, DocInfo, ServerPack, ServerResult};

/// A client editing one document.
#[derive(Debug, Clone)]
pub struct SyncClient {
    /// Client-side document.
    pub doc: Document,
    /// Server-side record of the client.
    pub info: ClientInfo,
    /// Server-side record of the document.
    pub doc_info: Arc<DocInfo>,
}

impl SyncClient {
    /// Registers a new client and attaches it to the fixture document
    /// called `name`.
    pub fn attach(be: &TestBackend, name: &str) -> Self {
        let doc_info = be.doc(name);
        let info = be.attached_client(&doc_info);
        let doc = Document::new(doc_info.key.clone(), info.id);
        Self {
            doc,
            info,
            doc_info,
        }
    }

    /// Authors a local change.
    pub fn update<F>(&mut self, build: F)
    where
        F: FnOnce(&mut ChangeBuilder),
    {
        self.doc.update(build).expect("Failed to update document");
    }

    /// Authors a local change setting one key.
    pub fn set(&mut self, key: &str, value: impl Into<Primitive>) {
        let value = value.into();
        self.update(|tx| {
            tx.set(key, value);
        });
    }

    /// Runs a push-pull cycle with the backend's context.
    pub fn sync(&mut self, be: &TestBackend) -> ServerResult<ServerPack> {
        self.sync_with(&be.ctx, &be.backend)
    }

    /// Runs a push-pull cycle and applies the response to the document.
    pub fn sync_with(&mut self, ctx: &Context, be: &Backend) -> ServerResult<ServerPack> {
        let request = self.doc.create_change_pack();
        let response = push_pull(ctx, be, &mut self.info, &self.doc_info, &request)?;
        self.doc
            .apply_change_pack(&response.clone().into_change_pack())
            .expect("Failed to apply response pack");
        Ok(response)
    }

    /// Returns the client-side checkpoint.
    pub fn checkpoint(&self) -> Checkpoint {
        self.doc.checkpoint()
    }

    /// Returns the document as JSON.
    pub fn marshal(&self) -> String {
        self.doc.marshal()
    }
}

/// Syncs every client twice, so each one sees every other's changes, then
/// asserts that all documents are equal.
pub fn sync_clients_then_assert_equal(be: &TestBackend, clients: &mut [&mut SyncClient]) {
    for _ in 0..2 {
        for client in clients.iter_mut() {
            client.sync(be).expect("Failed to sync client");
        }
    }

    if let Some((first, rest)) = clients.split_first() {
        for other in rest {
            assert_eq!(
                first.doc.root(),
                other.doc.root(),
                "documents diverged: {} vs {}",
                first.marshal(),
                other.marshal()
            );
        }
    }
}
