//! Benchmark utilities.

#![warn(missing_docs)]

use std::sync::Arc;
use tessera_protocol::{ChangePack, Checkpoint};
use tessera_server::{push_pull, BackendConfig, ClientInfo, DocInfo, ServerPack};
use tessera_testkit::{local_changes, TestBackend};

/// A backend with one document and one attached client.
pub struct Setup {
    /// Backend fixture.
    pub be: TestBackend,
    /// The document.
    pub doc: Arc<DocInfo>,
    /// A client attached to the document.
    pub client: ClientInfo,
}

impl Setup {
    /// Creates the setup, seeding `seeded` changes into the document.
    pub fn new(config: BackendConfig, seeded: u64) -> Self {
        let be = TestBackend::with_config(config);
        let doc = be.doc("bench");
        be.seed_changes(&doc, "k", seeded);
        let client = be.attached_client(&doc);
        Self { be, doc, client }
    }

    /// Request pack carrying `count` new changes of the client.
    pub fn push_request(&self, count: u64) -> ChangePack {
        let cp = self.client.checkpoint(self.doc.id);
        ChangePack::request(
            self.doc.key.clone(),
            cp,
            local_changes(self.client.id, cp.client_seq + 1, count),
        )
    }

    /// Runs one push-pull cycle of the client.
    pub fn push_pull(&mut self, req: &ChangePack) -> ServerPack {
        push_pull(&self.be.ctx, &self.be, &mut self.client, &self.doc, req)
            .expect("Failed to run push-pull")
    }

    /// Request pack of a client that has seen nothing.
    pub fn pull_request(&self) -> ChangePack {
        ChangePack::request(self.doc.key.clone(), Checkpoint::INITIAL, Vec::new())
    }
}
