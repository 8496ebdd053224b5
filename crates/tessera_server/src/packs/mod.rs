//! Push-pull cycle: push stage, pull stage and snapshots.
//!
//! [`push_pull`] runs one full cycle for a client and a document:
//!
//! 1. [`push`] accepts the client's unseen changes and stamps them
//! 2. the accepted changes and the client's checkpoint are persisted
//! 3. [`pull_response_pack`] reads back what the client is missing, either as
//!    changes or, past the snapshot threshold, as a snapshot
//! 4. the client's new checkpoint is persisted
//! 5. [`store_snapshot`] stores a snapshot when enough changes accumulated
//!
//! The stages can also be driven one by one; they share nothing but the
//! document's server sequence counter.

mod pull;
mod push;
mod server_pack;
mod snapshot;

pub use pull::{pull_response_pack, PullStrategy};
pub use push::push;
pub use server_pack::{Pulled, ServerPack};
pub use snapshot::{build_document, store_snapshot};

use crate::backend::Backend;
use crate::context::Context;
use crate::db::{ClientInfo, DocInfo};
use crate::error::ServerResult;
use tessera_protocol::ChangePack;
use tracing::{debug, error, info_span};

/// Runs a push-pull cycle for `client_info` on the document of `doc_info`.
///
/// Cycles of one document are serialized by the document's push-pull lock,
/// so the changes a client pushes are numbered right after the window it
/// pulls. `client_info` is updated with the new checkpoint and persisted.
///
/// A failure to store a periodic snapshot is logged and does not fail the
/// cycle.
///
/// # Errors
///
/// Returns [`DbError::DocumentNotAttached`](crate::DbError::DocumentNotAttached)
/// if the client has not attached the document, and any error of the push or
/// pull stage or the database. After an error the stored checkpoint covers
/// at most the changes that were persisted, so the client can resend its pack.
pub fn push_pull(
    ctx: &Context,
    be: &Backend,
    client_info: &mut ClientInfo,
    doc_info: &DocInfo,
    req_pack: &ChangePack,
) -> ServerResult<ServerPack> {
    let span = info_span!("push_pull", client = %client_info.id, doc = %doc_info.combined_key);
    let _enter = span.enter();

    client_info.ensure_document_attached(doc_info.id)?;

    let lock = be.document_lock(doc_info.id);
    let result = {
        let _guard = lock.lock();
        push_pull_locked(ctx, be, client_info, doc_info, req_pack)
    };
    be.release_document_lock(doc_info.id, lock);
    result
}

fn push_pull_locked(
    ctx: &Context,
    be: &Backend,
    client_info: &mut ClientInfo,
    doc_info: &DocInfo,
    req_pack: &ChangePack,
) -> ServerResult<ServerPack> {
    let initial_server_seq = doc_info.server_seq();
    let (pushed_cp, pushed_changes) =
        push(ctx, client_info, doc_info, req_pack, initial_server_seq)?;
    if !pushed_changes.is_empty() {
        be.db
            .create_change_infos(ctx, doc_info, initial_server_seq, &pushed_changes)?;
        // a retry after a failed pull must not push the same changes again,
        // so once they are stored the checkpoint write is not cancellable
        client_info.update_checkpoint(doc_info.id, pushed_cp)?;
        be.db
            .update_client_info_after_push_pull(&ctx.detached(), client_info, doc_info)?;
    }

    let response = pull_response_pack(
        ctx,
        be,
        client_info,
        doc_info,
        req_pack,
        pushed_cp,
        initial_server_seq,
    )?;
    client_info.update_checkpoint(doc_info.id, response.checkpoint)?;
    be.db.update_client_info_after_push_pull(ctx, client_info, doc_info)?;

    match store_snapshot(ctx, be, doc_info) {
        Ok(_) => {}
        Err(err) if err.is_cancelled() => debug!("snapshot skipped: {err}"),
        Err(err) => error!(error = %err, "failed to store snapshot"),
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::db::{DbError, DocId};
    use crate::error::ServerError;
    use std::sync::Arc;
    use tessera_protocol::{Change, ChangeId, Checkpoint, DocKey, Operation};

    struct Fixture {
        backend: Backend,
        client: ClientInfo,
        doc: Arc<DocInfo>,
        ctx: Context,
    }

    fn fixture(config: BackendConfig) -> Fixture {
        let ctx = Context::new();
        let backend = Backend::with_memory_db(config).unwrap();
        let doc = backend
            .db
            .find_doc_info_by_key_or_create(&ctx, &DocKey::new("notes", "doc"))
            .unwrap();
        let mut client = backend.db.create_client_info(&ctx, "client").unwrap();
        client.attach_document(doc.id);
        backend
            .db
            .update_client_info_after_push_pull(&ctx, &client, &doc)
            .unwrap();
        Fixture {
            backend,
            client,
            doc,
            ctx,
        }
    }

    fn request(f: &Fixture, cp: Checkpoint, client_seqs: &[u64]) -> ChangePack {
        let changes = client_seqs
            .iter()
            .map(|&seq| {
                Change::new(
                    ChangeId::new(seq, seq, f.client.id),
                    vec![Operation::set("k", seq as i64)],
                )
            })
            .collect();
        ChangePack::request(f.doc.key.clone(), cp, changes)
    }

    #[test]
    fn push_then_duplicate() {
        let mut f = fixture(BackendConfig::default());

        let req = request(&f, Checkpoint::INITIAL, &[1, 2, 3]);
        let resp = push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap();
        assert_eq!(resp.checkpoint, Checkpoint::new(3, 3));
        // pushed changes are not echoed back to their author
        assert_eq!(resp.changes_len(), 0);
        assert_eq!(f.doc.server_seq(), 3);

        let req = request(&f, Checkpoint::new(3, 3), &[2]);
        let resp = push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap();
        assert_eq!(resp.checkpoint, Checkpoint::new(3, 3));
        assert_eq!(f.doc.server_seq(), 3);

        let stored = f.backend.db.find_client_info(&f.ctx, f.client.id).unwrap();
        assert_eq!(stored.checkpoint(f.doc.id), Checkpoint::new(3, 3));
    }

    #[test]
    fn detached_client_is_refused() {
        let mut f = fixture(BackendConfig::default());
        let other = DocInfo::new(DocId::new(), DocKey::new("notes", "other"));

        let req = request(&f, Checkpoint::INITIAL, &[1]);
        let err = push_pull(&f.ctx, &f.backend, &mut f.client, &other, &req).unwrap_err();
        assert!(matches!(
            err,
            ServerError::Database(DbError::DocumentNotAttached { .. })
        ));
        assert!(err.is_client_error());
    }

    #[test]
    fn client_ahead_is_refused_without_losing_pushed_changes() {
        let mut f = fixture(BackendConfig::default());

        let req = request(&f, Checkpoint::new(10, 0), &[1]);
        let err = push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap_err();
        assert!(matches!(err, ServerError::InvalidServerSeq { requested: 10, .. }));

        // the change was stored and acknowledged; resending it is a no-op
        let req = request(&f, Checkpoint::INITIAL, &[1]);
        push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap();
        assert_eq!(f.doc.server_seq(), 1);
    }

    #[test]
    fn document_locks_are_released_after_cycles() {
        let mut f = fixture(BackendConfig::default());

        let req = request(&f, Checkpoint::INITIAL, &[1]);
        push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap();
        assert_eq!(f.backend.document_lock_count(), 0);

        // failed cycles release the lock too
        let req = request(&f, Checkpoint::new(10, 1), &[]);
        push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap_err();
        assert_eq!(f.backend.document_lock_count(), 0);
    }

    #[test]
    fn periodic_snapshot_is_stored() {
        let mut f = fixture(BackendConfig::new().with_snapshot_interval(3));

        let req = request(&f, Checkpoint::INITIAL, &[1, 2, 3]);
        push_pull(&f.ctx, &f.backend, &mut f.client, &f.doc, &req).unwrap();

        let last = f
            .backend
            .db
            .find_last_snapshot_info(&f.ctx, f.doc.id)
            .unwrap()
            .unwrap();
        assert_eq!(last.server_seq, 3);
    }
}
