//! Backend fixtures and fault injection.
//!
//! Provides a ready-to-use backend over an in-memory database, helpers to
//! register documents and attached clients, and [`FlakyDatabase`], which
//! fails selected storage calls on demand.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tessera_document::Document;
use tessera_protocol::{Change, ChangeId, ClientId, DocKey, Operation};
use tessera_server::{
    Backend, BackendConfig, ChangeInfo, ClientInfo, Context, Database, DbError, DbResult, DocId,
    DocInfo, MemoryDatabase, SnapshotInfo,
};

/// Collection every fixture document lives in.
pub const TEST_COLLECTION: &str = "test";

/// A backend plus the context used to drive it.
pub struct TestBackend {
    /// The backend instance.
    pub backend: Backend,
    /// Context passed to every call made by the fixture.
    pub ctx: Context,
}

impl TestBackend {
    /// Creates a backend with the default configuration over a fresh
    /// in-memory database.
    pub fn new() -> Self {
        Self::with_config(BackendConfig::default())
    }

    /// Creates a backend with `config` over a fresh in-memory database.
    pub fn with_config(config: BackendConfig) -> Self {
        Self::with_db(config, Arc::new(MemoryDatabase::new()))
    }

    /// Creates a backend with `config` over `db`.
    pub fn with_db(config: BackendConfig, db: Arc<dyn Database>) -> Self {
        Self {
            backend: Backend::new(config, db).expect("Invalid backend config"),
            ctx: Context::new(),
        }
    }

    /// Creates a backend over a [`FlakyDatabase`] and returns both.
    pub fn flaky(config: BackendConfig) -> (Self, Arc<FlakyDatabase>) {
        let db = Arc::new(FlakyDatabase::new());
        (Self::with_db(config, db.clone()), db)
    }

    /// Returns the key of the fixture document called `name`.
    pub fn doc_key(name: &str) -> DocKey {
        DocKey::new(TEST_COLLECTION, name)
    }

    /// Finds or creates the fixture document called `name`.
    pub fn doc(&self, name: &str) -> Arc<DocInfo> {
        self.backend
            .db
            .find_doc_info_by_key_or_create(&self.ctx, &Self::doc_key(name))
            .expect("Failed to create document")
    }

    /// Registers a client that has attached `doc`, and persists it.
    pub fn attached_client(&self, doc: &DocInfo) -> ClientInfo {
        let mut client = self
            .backend
            .db
            .create_client_info(&self.ctx, "test-client")
            .expect("Failed to create client");
        client.attach_document(doc.id);
        self.backend
            .db
            .update_client_info_after_push_pull(&self.ctx, &client, doc)
            .expect("Failed to persist client");
        client
    }

    /// Reloads a client from the database.
    pub fn reload_client(&self, client_id: ClientId) -> ClientInfo {
        self.backend
            .db
            .find_client_info(&self.ctx, client_id)
            .expect("Failed to load client")
    }

    /// Returns every stored change of `doc` in server-sequence order.
    pub fn stored_changes(&self, doc: &DocInfo) -> Vec<ChangeInfo> {
        self.backend
            .db
            .find_change_infos_between_server_seqs(&self.ctx, doc.id, 1, u64::MAX)
            .expect("Failed to read changes")
    }

    /// Stores `count` changes by a fresh author directly, bypassing the push
    /// stage. Each change sets `key` to its client sequence.
    pub fn seed_changes(&self, doc: &DocInfo, key: &str, count: u64) {
        let author = ClientId::new();
        let initial = doc.server_seq();
        let changes: Vec<_> = (1..=count)
            .map(|i| {
                let server_seq = doc.increase_server_seq();
                Change::new(
                    ChangeId::new(i, server_seq, author),
                    vec![Operation::set(key, i as i64)],
                )
                .stamped(server_seq)
            })
            .collect();
        self.backend
            .db
            .create_change_infos(&self.ctx, doc, initial, &changes)
            .expect("Failed to seed changes");
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestBackend {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

/// Builds `count` unstamped changes by `actor` with client sequences
/// `first..first + count`.
pub fn local_changes(actor: ClientId, first: u64, count: u64) -> Vec<Change> {
    (first..first + count)
        .map(|seq| {
            Change::new(
                ChangeId::new(seq, seq, actor),
                vec![Operation::set(format!("key-{seq}"), seq as i64)],
            )
        })
        .collect()
}

/// A [`MemoryDatabase`] that fails selected calls while a switch is on.
///
/// Failures are reported as [`DbError::Storage`]. The `cancel_after_*`
/// switches let the write succeed and then cancel the caller's context, as a
/// deadline expiring between two writes would.
#[derive(Default)]
pub struct FlakyDatabase {
    inner: MemoryDatabase,
    fail_change_reads: AtomicBool,
    fail_change_writes: AtomicBool,
    fail_client_writes: AtomicBool,
    fail_snapshot_reads: AtomicBool,
    fail_snapshot_writes: AtomicBool,
    cancel_after_change_writes: AtomicBool,
    cancel_after_client_writes: AtomicBool,
}

impl FlakyDatabase {
    /// Creates a database that does not fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails range reads of changes.
    pub fn fail_change_reads(&self, fail: bool) {
        self.fail_change_reads.store(fail, Ordering::SeqCst);
    }

    /// Fails writes of changes.
    pub fn fail_change_writes(&self, fail: bool) {
        self.fail_change_writes.store(fail, Ordering::SeqCst);
    }

    /// Fails writes of client records.
    pub fn fail_client_writes(&self, fail: bool) {
        self.fail_client_writes.store(fail, Ordering::SeqCst);
    }

    /// Fails reads of the last snapshot.
    pub fn fail_snapshot_reads(&self, fail: bool) {
        self.fail_snapshot_reads.store(fail, Ordering::SeqCst);
    }

    /// Fails writes of snapshots.
    pub fn fail_snapshot_writes(&self, fail: bool) {
        self.fail_snapshot_writes.store(fail, Ordering::SeqCst);
    }

    /// Cancels the caller's context once a write of changes succeeded.
    pub fn cancel_after_change_writes(&self, cancel: bool) {
        self.cancel_after_change_writes.store(cancel, Ordering::SeqCst);
    }

    /// Cancels the caller's context once a write of a client succeeded.
    pub fn cancel_after_client_writes(&self, cancel: bool) {
        self.cancel_after_client_writes.store(cancel, Ordering::SeqCst);
    }

    /// Returns the wrapped database.
    pub fn inner(&self) -> &MemoryDatabase {
        &self.inner
    }

    fn check(switch: &AtomicBool, what: &str) -> DbResult<()> {
        if switch.load(Ordering::SeqCst) {
            Err(DbError::Storage(format!("injected {what} failure")))
        } else {
            Ok(())
        }
    }

    fn cancel_if(switch: &AtomicBool, ctx: &Context) {
        if switch.load(Ordering::SeqCst) {
            ctx.cancel();
        }
    }
}

impl Database for FlakyDatabase {
    fn find_doc_info(&self, ctx: &Context, doc_id: DocId) -> DbResult<Arc<DocInfo>> {
        self.inner.find_doc_info(ctx, doc_id)
    }

    fn find_doc_info_by_key_or_create(
        &self,
        ctx: &Context,
        key: &DocKey,
    ) -> DbResult<Arc<DocInfo>> {
        self.inner.find_doc_info_by_key_or_create(ctx, key)
    }

    fn create_client_info(&self, ctx: &Context, key: &str) -> DbResult<ClientInfo> {
        self.inner.create_client_info(ctx, key)
    }

    fn find_client_info(&self, ctx: &Context, client_id: ClientId) -> DbResult<ClientInfo> {
        self.inner.find_client_info(ctx, client_id)
    }

    fn update_client_info_after_push_pull(
        &self,
        ctx: &Context,
        client_info: &ClientInfo,
        doc_info: &DocInfo,
    ) -> DbResult<()> {
        Self::check(&self.fail_client_writes, "client write")?;
        self.inner
            .update_client_info_after_push_pull(ctx, client_info, doc_info)?;
        Self::cancel_if(&self.cancel_after_client_writes, ctx);
        Ok(())
    }

    fn create_change_infos(
        &self,
        ctx: &Context,
        doc_info: &DocInfo,
        initial_server_seq: u64,
        changes: &[Change],
    ) -> DbResult<()> {
        Self::check(&self.fail_change_writes, "change write")?;
        self.inner
            .create_change_infos(ctx, doc_info, initial_server_seq, changes)?;
        Self::cancel_if(&self.cancel_after_change_writes, ctx);
        Ok(())
    }

    fn find_change_infos_between_server_seqs(
        &self,
        ctx: &Context,
        doc_id: DocId,
        from: u64,
        to: u64,
    ) -> DbResult<Vec<ChangeInfo>> {
        Self::check(&self.fail_change_reads, "change read")?;
        self.inner
            .find_change_infos_between_server_seqs(ctx, doc_id, from, to)
    }

    fn create_snapshot_info(&self, ctx: &Context, doc_id: DocId, doc: &Document) -> DbResult<()> {
        Self::check(&self.fail_snapshot_writes, "snapshot write")?;
        self.inner.create_snapshot_info(ctx, doc_id, doc)
    }

    fn find_last_snapshot_info(
        &self,
        ctx: &Context,
        doc_id: DocId,
    ) -> DbResult<Option<SnapshotInfo>> {
        Self::check(&self.fail_snapshot_reads, "snapshot read")?;
        self.inner.find_last_snapshot_info(ctx, doc_id)
    }
}
