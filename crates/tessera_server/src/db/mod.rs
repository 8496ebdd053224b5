//! Storage records and the database interface.
//!
//! The sync core reads and writes through [`Database`]. Implementations must
//! return ranges of changes in ascending server-sequence order and must be
//! safe to call from many threads at once.

mod change_info;
mod client_info;
mod doc_info;
mod error;
mod memory;
mod snapshot_info;

pub use change_info::ChangeInfo;
pub use client_info::{ClientDocInfo, ClientInfo, DocumentStatus};
pub use doc_info::{DocId, DocInfo};
pub use error::{DbError, DbResult};
pub use memory::MemoryDatabase;
pub use snapshot_info::SnapshotInfo;

use crate::context::Context;
use std::sync::Arc;
use tessera_document::Document;
use tessera_protocol::{Change, ClientId, DocKey};

/// Storage used by the sync core.
pub trait Database: Send + Sync {
    /// Finds a document by ID.
    fn find_doc_info(&self, ctx: &Context, doc_id: DocId) -> DbResult<Arc<DocInfo>>;

    /// Finds a document by key, creating it if it does not exist.
    fn find_doc_info_by_key_or_create(&self, ctx: &Context, key: &DocKey)
        -> DbResult<Arc<DocInfo>>;

    /// Registers a new client.
    fn create_client_info(&self, ctx: &Context, key: &str) -> DbResult<ClientInfo>;

    /// Finds a client by ID.
    fn find_client_info(&self, ctx: &Context, client_id: ClientId) -> DbResult<ClientInfo>;

    /// Persists what `client_info` knows about the document of `doc_info`
    /// after a push-pull cycle.
    fn update_client_info_after_push_pull(
        &self,
        ctx: &Context,
        client_info: &ClientInfo,
        doc_info: &DocInfo,
    ) -> DbResult<()>;

    /// Persists changes accepted by the push stage.
    ///
    /// `initial_server_seq` is the document's server sequence when the cycle
    /// started; every change must carry a larger one.
    fn create_change_infos(
        &self,
        ctx: &Context,
        doc_info: &DocInfo,
        initial_server_seq: u64,
        changes: &[Change],
    ) -> DbResult<()>;

    /// Returns the stored changes with server sequences in `from..=to`, in
    /// ascending order. An empty range yields an empty vector.
    fn find_change_infos_between_server_seqs(
        &self,
        ctx: &Context,
        doc_id: DocId,
        from: u64,
        to: u64,
    ) -> DbResult<Vec<ChangeInfo>>;

    /// Same as [`Database::find_change_infos_between_server_seqs`] but
    /// returns protocol changes.
    fn find_changes_between_server_seqs(
        &self,
        ctx: &Context,
        doc_id: DocId,
        from: u64,
        to: u64,
    ) -> DbResult<Vec<Change>> {
        let infos = self.find_change_infos_between_server_seqs(ctx, doc_id, from, to)?;
        Ok(infos.iter().map(ChangeInfo::to_change).collect())
    }

    /// Stores a snapshot of `doc` at its checkpoint's server sequence.
    fn create_snapshot_info(&self, ctx: &Context, doc_id: DocId, doc: &Document) -> DbResult<()>;

    /// Returns the snapshot with the highest server sequence, if any.
    fn find_last_snapshot_info(&self, ctx: &Context, doc_id: DocId)
        -> DbResult<Option<SnapshotInfo>>;
}
