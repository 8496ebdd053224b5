//! In-memory database.

use crate::context::Context;
use crate::db::{
    ChangeInfo, ClientDocInfo, ClientInfo, Database, DbError, DbResult, DocId, DocInfo,
    DocumentStatus, SnapshotInfo,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tessera_document::Document;
use tessera_protocol::{Change, ClientId, DocKey, ProtocolResult};

#[derive(Default)]
struct DocTable {
    by_id: HashMap<DocId, Arc<DocInfo>>,
    by_key: HashMap<DocKey, DocId>,
}

/// A [`Database`] kept entirely in memory.
///
/// Changes and snapshots of each document are held in ordered maps keyed by
/// server sequence, so range reads are ascending by construction.
#[derive(Default)]
pub struct MemoryDatabase {
    docs: RwLock<DocTable>,
    clients: RwLock<HashMap<ClientId, ClientInfo>>,
    changes: RwLock<HashMap<DocId, BTreeMap<u64, ChangeInfo>>>,
    snapshots: RwLock<HashMap<DocId, BTreeMap<u64, SnapshotInfo>>>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored changes of a document.
    pub fn change_count(&self, doc_id: DocId) -> usize {
        self.changes.read().get(&doc_id).map_or(0, BTreeMap::len)
    }

    /// Returns the number of stored snapshots of a document.
    pub fn snapshot_count(&self, doc_id: DocId) -> usize {
        self.snapshots.read().get(&doc_id).map_or(0, BTreeMap::len)
    }
}

impl Database for MemoryDatabase {
    fn find_doc_info(&self, ctx: &Context, doc_id: DocId) -> DbResult<Arc<DocInfo>> {
        ctx.check()?;
        self.docs
            .read()
            .by_id
            .get(&doc_id)
            .cloned()
            .ok_or(DbError::DocumentNotFound(doc_id))
    }

    fn find_doc_info_by_key_or_create(
        &self,
        ctx: &Context,
        key: &DocKey,
    ) -> DbResult<Arc<DocInfo>> {
        ctx.check()?;
        {
            let docs = self.docs.read();
            if let Some(info) = docs.by_key.get(key).and_then(|id| docs.by_id.get(id)) {
                return Ok(Arc::clone(info));
            }
        }

        let mut docs = self.docs.write();
        // another caller may have created it between the two locks
        if let Some(info) = docs.by_key.get(key).and_then(|id| docs.by_id.get(id)) {
            return Ok(Arc::clone(info));
        }
        let info = Arc::new(DocInfo::new(DocId::new(), key.clone()));
        docs.by_key.insert(key.clone(), info.id);
        docs.by_id.insert(info.id, Arc::clone(&info));
        Ok(info)
    }

    fn create_client_info(&self, ctx: &Context, key: &str) -> DbResult<ClientInfo> {
        ctx.check()?;
        let info = ClientInfo::new(ClientId::new(), key);
        self.clients.write().insert(info.id, info.clone());
        Ok(info)
    }

    fn find_client_info(&self, ctx: &Context, client_id: ClientId) -> DbResult<ClientInfo> {
        ctx.check()?;
        self.clients
            .read()
            .get(&client_id)
            .cloned()
            .ok_or(DbError::ClientNotFound(client_id))
    }

    fn update_client_info_after_push_pull(
        &self,
        ctx: &Context,
        client_info: &ClientInfo,
        doc_info: &DocInfo,
    ) -> DbResult<()> {
        ctx.check()?;
        let incoming = client_info
            .document(doc_info.id)
            .ok_or(DbError::DocumentNotAttached {
                client: client_info.id,
                doc: doc_info.id,
            })?;

        let mut clients = self.clients.write();
        let stored = clients
            .get_mut(&client_info.id)
            .ok_or(DbError::ClientNotFound(client_info.id))?;

        // a stale writer never moves an attached checkpoint backward
        let checkpoint = match stored.document(doc_info.id) {
            Some(prev)
                if prev.status == DocumentStatus::Attached
                    && incoming.status == DocumentStatus::Attached =>
            {
                prev.checkpoint.forward(incoming.checkpoint)
            }
            _ => incoming.checkpoint,
        };
        stored.set_document(
            doc_info.id,
            ClientDocInfo {
                status: incoming.status,
                checkpoint,
            },
        );
        Ok(())
    }

    fn create_change_infos(
        &self,
        ctx: &Context,
        doc_info: &DocInfo,
        initial_server_seq: u64,
        changes: &[Change],
    ) -> DbResult<()> {
        ctx.check()?;
        if changes.is_empty() {
            return Ok(());
        }

        let infos = changes
            .iter()
            .map(|c| ChangeInfo::from_change(doc_info.id, c))
            .collect::<ProtocolResult<Vec<_>>>()?;
        if let Some(stale) = infos.iter().find(|i| i.server_seq <= initial_server_seq) {
            return Err(DbError::Storage(format!(
                "change with server seq {} is not newer than {} in '{}'",
                stale.server_seq, initial_server_seq, doc_info.combined_key
            )));
        }

        let mut changes = self.changes.write();
        let log = changes.entry(doc_info.id).or_default();
        if let Some(dup) = infos.iter().find(|i| log.contains_key(&i.server_seq)) {
            return Err(DbError::Storage(format!(
                "server seq {} already stored in '{}'",
                dup.server_seq, doc_info.combined_key
            )));
        }
        for info in infos {
            log.insert(info.server_seq, info);
        }
        Ok(())
    }

    fn find_change_infos_between_server_seqs(
        &self,
        ctx: &Context,
        doc_id: DocId,
        from: u64,
        to: u64,
    ) -> DbResult<Vec<ChangeInfo>> {
        ctx.check()?;
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self.changes.read().get(&doc_id).map_or_else(Vec::new, |log| {
            log.range(from..=to).map(|(_, info)| info.clone()).collect()
        }))
    }

    fn create_snapshot_info(&self, ctx: &Context, doc_id: DocId, doc: &Document) -> DbResult<()> {
        ctx.check()?;
        let server_seq = doc.checkpoint().server_seq;
        let snapshot = doc.serialize_root_to_bytes()?;

        self.snapshots
            .write()
            .entry(doc_id)
            .or_default()
            .entry(server_seq)
            .or_insert_with(|| SnapshotInfo::new(doc_id, server_seq, snapshot));
        Ok(())
    }

    fn find_last_snapshot_info(
        &self,
        ctx: &Context,
        doc_id: DocId,
    ) -> DbResult<Option<SnapshotInfo>> {
        ctx.check()?;
        Ok(self
            .snapshots
            .read()
            .get(&doc_id)
            .and_then(|snapshots| snapshots.values().next_back().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_protocol::{ChangeId, Checkpoint, Operation};

    fn stamped(actor: ClientId, client_seq: u64, server_seq: u64) -> Change {
        Change::new(
            ChangeId::new(client_seq, client_seq, actor),
            vec![Operation::set("k", client_seq as i64)],
        )
        .stamped(server_seq)
    }

    fn setup() -> (MemoryDatabase, Arc<DocInfo>, Context) {
        let ctx = Context::new();
        let db = MemoryDatabase::new();
        let doc = db
            .find_doc_info_by_key_or_create(&ctx, &DocKey::new("notes", "doc"))
            .unwrap();
        (db, doc, ctx)
    }

    #[test]
    fn doc_lookup_by_key_is_stable() {
        let (db, doc, ctx) = setup();
        let again = db
            .find_doc_info_by_key_or_create(&ctx, &DocKey::new("notes", "doc"))
            .unwrap();
        assert!(Arc::ptr_eq(&doc, &again));
        assert!(Arc::ptr_eq(&doc, &db.find_doc_info(&ctx, doc.id).unwrap()));

        let err = db.find_doc_info(&ctx, DocId::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn client_round_trip() {
        let (db, doc, ctx) = setup();
        let mut client = db.create_client_info(&ctx, "alice").unwrap();
        client.attach_document(doc.id);
        client.update_checkpoint(doc.id, Checkpoint::new(3, 2)).unwrap();
        db.update_client_info_after_push_pull(&ctx, &client, &doc).unwrap();

        let stored = db.find_client_info(&ctx, client.id).unwrap();
        assert_eq!(stored.checkpoint(doc.id), Checkpoint::new(3, 2));
        assert!(stored.is_attached(doc.id));

        assert!(matches!(
            db.find_client_info(&ctx, ClientId::new()),
            Err(DbError::ClientNotFound(_))
        ));
    }

    #[test]
    fn stale_client_update_does_not_regress() {
        let (db, doc, ctx) = setup();
        let mut client = db.create_client_info(&ctx, "alice").unwrap();
        client.attach_document(doc.id);
        let mut stale = client.clone();

        client.update_checkpoint(doc.id, Checkpoint::new(5, 5)).unwrap();
        db.update_client_info_after_push_pull(&ctx, &client, &doc).unwrap();
        stale.update_checkpoint(doc.id, Checkpoint::new(2, 2)).unwrap();
        db.update_client_info_after_push_pull(&ctx, &stale, &doc).unwrap();

        let stored = db.find_client_info(&ctx, client.id).unwrap();
        assert_eq!(stored.checkpoint(doc.id), Checkpoint::new(5, 5));
    }

    #[test]
    fn unattached_client_update_fails() {
        let (db, doc, ctx) = setup();
        let client = db.create_client_info(&ctx, "alice").unwrap();
        let err = db
            .update_client_info_after_push_pull(&ctx, &client, &doc)
            .unwrap_err();
        assert!(matches!(err, DbError::DocumentNotAttached { .. }));
    }

    #[test]
    fn range_reads_are_inclusive_and_ordered() {
        let (db, doc, ctx) = setup();
        let actor = ClientId::new();
        let changes: Vec<_> = (1..=5).map(|i| stamped(actor, i, i)).collect();
        db.create_change_infos(&ctx, &doc, 0, &changes).unwrap();
        assert_eq!(db.change_count(doc.id), 5);

        let infos = db
            .find_change_infos_between_server_seqs(&ctx, doc.id, 2, 4)
            .unwrap();
        let seqs: Vec<_> = infos.iter().map(|i| i.server_seq).collect();
        assert_eq!(seqs, vec![2, 3, 4]);

        let changes = db.find_changes_between_server_seqs(&ctx, doc.id, 5, 9).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].server_seq(), Some(5));

        assert!(db
            .find_change_infos_between_server_seqs(&ctx, doc.id, 4, 3)
            .unwrap()
            .is_empty());
        assert!(db
            .find_change_infos_between_server_seqs(&ctx, DocId::new(), 1, 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn change_records_are_validated() {
        let (db, doc, ctx) = setup();
        let actor = ClientId::new();

        let unstamped = Change::new(ChangeId::new(1, 1, actor), vec![]);
        assert!(matches!(
            db.create_change_infos(&ctx, &doc, 0, &[unstamped]),
            Err(DbError::Protocol(_))
        ));

        db.create_change_infos(&ctx, &doc, 0, &[stamped(actor, 1, 1)]).unwrap();
        assert!(matches!(
            db.create_change_infos(&ctx, &doc, 0, &[stamped(actor, 2, 1)]),
            Err(DbError::Storage(_))
        ));
        assert!(matches!(
            db.create_change_infos(&ctx, &doc, 3, &[stamped(actor, 2, 3)]),
            Err(DbError::Storage(_))
        ));
        assert_eq!(db.change_count(doc.id), 1);
    }

    #[test]
    fn last_snapshot_wins() {
        let (db, doc, ctx) = setup();
        assert_eq!(db.find_last_snapshot_info(&ctx, doc.id).unwrap(), None);

        let early = Document::from_snapshot(doc.key.clone(), 3, &[]).unwrap();
        let late = Document::from_snapshot(doc.key.clone(), 8, &[]).unwrap();
        db.create_snapshot_info(&ctx, doc.id, &late).unwrap();
        db.create_snapshot_info(&ctx, doc.id, &early).unwrap();

        let last = db.find_last_snapshot_info(&ctx, doc.id).unwrap().unwrap();
        assert_eq!(last.server_seq, 8);
        assert_eq!(db.snapshot_count(doc.id), 2);
    }

    #[test]
    fn cancelled_context_fails_every_call() {
        let (db, doc, ctx) = setup();
        ctx.cancel();
        assert_eq!(
            db.find_change_infos_between_server_seqs(&ctx, doc.id, 1, 2),
            Err(DbError::Cancelled)
        );
        assert_eq!(db.find_last_snapshot_info(&ctx, doc.id), Err(DbError::Cancelled));
    }
}
