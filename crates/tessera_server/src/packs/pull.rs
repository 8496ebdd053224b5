//! Pull stage: answer with what the client is missing.

use crate::backend::Backend;
use crate::context::Context;
use crate::db::{ChangeInfo, ClientInfo, DocInfo};
use crate::error::{ServerError, ServerResult};
use crate::packs::server_pack::ServerPack;
use crate::packs::snapshot::pull_snapshot;
use tessera_protocol::{ChangePack, Checkpoint};
use tracing::info;

/// How the pull stage catches a client up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStrategy {
    /// Send the missing changes.
    Changes,
    /// Send a snapshot of the document.
    Snapshot,
}

impl PullStrategy {
    /// Picks the strategy for a client at `requested` when the document is at
    /// `initial`: changes while the gap stays below `threshold`, a snapshot
    /// from there on.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidServerSeq`] if the client is ahead of
    /// the document.
    pub fn decide(initial: u64, requested: u64, threshold: u64) -> ServerResult<Self> {
        let gap = initial
            .checked_sub(requested)
            .ok_or(ServerError::InvalidServerSeq { initial, requested })?;
        Ok(if gap < threshold {
            PullStrategy::Changes
        } else {
            PullStrategy::Snapshot
        })
    }
}

/// Builds the response pack of a push-pull cycle.
///
/// The client is caught up to `initial_server_seq`, the document's server
/// sequence when the cycle started, from the server sequence of its request
/// checkpoint. The returned checkpoint starts from `pushed_cp` and never
/// falls behind the changes the client just pushed.
///
/// # Errors
///
/// Returns [`ServerError::InvalidServerSeq`] if the request checkpoint is
/// ahead of the document, or the storage and reconstruction errors of the
/// chosen path.
pub fn pull_response_pack(
    ctx: &Context,
    be: &Backend,
    client_info: &ClientInfo,
    doc_info: &DocInfo,
    req_pack: &ChangePack,
    pushed_cp: Checkpoint,
    initial_server_seq: u64,
) -> ServerResult<ServerPack> {
    let requested = req_pack.checkpoint.server_seq;
    match PullStrategy::decide(initial_server_seq, requested, be.config.snapshot_threshold)? {
        PullStrategy::Changes => {
            let (cp, changes) = pull_change_infos(
                ctx,
                be,
                client_info,
                doc_info,
                req_pack,
                pushed_cp,
                initial_server_seq,
            )?;
            Ok(ServerPack::with_changes(doc_info.key.clone(), cp, changes))
        }
        PullStrategy::Snapshot => {
            let (cp, snapshot) =
                pull_snapshot(ctx, be, client_info, doc_info, pushed_cp, initial_server_seq)?;
            Ok(ServerPack::with_snapshot(doc_info.key.clone(), cp, snapshot))
        }
    }
}

fn pull_change_infos(
    ctx: &Context,
    be: &Backend,
    client_info: &ClientInfo,
    doc_info: &DocInfo,
    req_pack: &ChangePack,
    pushed_cp: Checkpoint,
    initial_server_seq: u64,
) -> ServerResult<(Checkpoint, Vec<ChangeInfo>)> {
    ctx.check()?;

    let from = req_pack.checkpoint.server_seq + 1;
    let to = initial_server_seq;
    let pulled = be
        .db
        .find_change_infos_between_server_seqs(ctx, doc_info.id, from, to)
        .map_err(|source| ServerError::ReadChanges {
            doc_key: doc_info.combined_key.clone(),
            from,
            to,
            source,
        })?;

    let cp = pushed_cp.next_server_seq(initial_server_seq);
    if let (Some(first), Some(last)) = (pulled.first(), pulled.last()) {
        info!(
            client = %client_info.id,
            doc = %doc_info.combined_key,
            pulled = pulled.len(),
            from = first.server_seq,
            to = last.server_seq,
            cp = %cp,
            "PULL: pulled changes"
        );
    }

    Ok((cp, pulled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use crate::db::DbError;
    use crate::packs::server_pack::Pulled;
    use std::sync::Arc;
    use tessera_protocol::{Change, ChangeId, ClientId, Operation};

    #[test]
    fn threshold_boundary() {
        assert_eq!(PullStrategy::decide(99, 0, 100).unwrap(), PullStrategy::Changes);
        assert_eq!(PullStrategy::decide(100, 0, 100).unwrap(), PullStrategy::Snapshot);
        assert_eq!(PullStrategy::decide(150, 100, 100).unwrap(), PullStrategy::Changes);
        assert_eq!(PullStrategy::decide(7, 7, 1).unwrap(), PullStrategy::Changes);
    }

    #[test]
    fn client_ahead_of_document_is_rejected() {
        let err = PullStrategy::decide(5, 6, 100).unwrap_err();
        assert!(matches!(
            err,
            ServerError::InvalidServerSeq {
                initial: 5,
                requested: 6
            }
        ));
    }

    struct Fixture {
        backend: Backend,
        client: ClientInfo,
        doc: Arc<DocInfo>,
        ctx: Context,
    }

    fn fixture(threshold: u64, stored: u64) -> Fixture {
        let ctx = Context::new();
        let config = BackendConfig::new().with_snapshot_threshold(threshold);
        let backend = Backend::with_memory_db(config).unwrap();
        let doc = backend
            .db
            .find_doc_info_by_key_or_create(&ctx, &tessera_protocol::DocKey::new("notes", "doc"))
            .unwrap();
        let mut client = ClientInfo::new(ClientId::new(), "client");
        client.attach_document(doc.id);

        let author = ClientId::new();
        let changes: Vec<_> = (1..=stored)
            .map(|i| {
                let seq = doc.increase_server_seq();
                Change::new(
                    ChangeId::new(i, i, author),
                    vec![Operation::set(format!("k{i}"), i as i64)],
                )
                .stamped(seq)
            })
            .collect();
        backend.db.create_change_infos(&ctx, &doc, 0, &changes).unwrap();

        Fixture {
            backend,
            client,
            doc,
            ctx,
        }
    }

    fn request(f: &Fixture, server_seq: u64) -> ChangePack {
        ChangePack::request(f.doc.key.clone(), Checkpoint::new(server_seq, 0), vec![])
    }

    #[test]
    fn gap_below_threshold_pulls_changes() {
        let f = fixture(100, 150);
        let pack = pull_response_pack(
            &f.ctx,
            &f.backend,
            &f.client,
            &f.doc,
            &request(&f, 100),
            Checkpoint::new(100, 0),
            150,
        )
        .unwrap();

        let seqs: Vec<_> = pack.changes().iter().map(|c| c.server_seq).collect();
        assert_eq!(seqs, (101..=150).collect::<Vec<_>>());
        assert_eq!(pack.checkpoint, Checkpoint::new(150, 0));
    }

    #[test]
    fn up_to_date_client_pulls_nothing() {
        let f = fixture(10, 3);
        let pack = pull_response_pack(
            &f.ctx,
            &f.backend,
            &f.client,
            &f.doc,
            &request(&f, 3),
            Checkpoint::new(3, 0),
            3,
        )
        .unwrap();
        assert_eq!(pack.pulled, Pulled::Changes(vec![]));
    }

    #[test]
    fn checkpoint_keeps_pushed_changes() {
        let f = fixture(10, 5);
        // the client pushed up to 5 while the cycle started at 3
        let pack = pull_response_pack(
            &f.ctx,
            &f.backend,
            &f.client,
            &f.doc,
            &request(&f, 0),
            Checkpoint::new(5, 2),
            3,
        )
        .unwrap();

        assert_eq!(pack.checkpoint, Checkpoint::new(5, 2));
        assert_eq!(pack.changes_len(), 3);
    }

    #[test]
    fn gap_at_threshold_pulls_snapshot() {
        let f = fixture(4, 4);
        let pack = pull_response_pack(
            &f.ctx,
            &f.backend,
            &f.client,
            &f.doc,
            &request(&f, 0),
            Checkpoint::INITIAL,
            4,
        )
        .unwrap();
        assert!(pack.is_snapshot());
        assert_eq!(pack.checkpoint, Checkpoint::new(4, 0));
    }

    #[test]
    fn cancelled_pull_reads_nothing() {
        let f = fixture(10, 3);
        f.ctx.cancel();
        let err = pull_response_pack(
            &f.ctx,
            &f.backend,
            &f.client,
            &f.doc,
            &request(&f, 0),
            Checkpoint::INITIAL,
            3,
        )
        .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!matches!(err, ServerError::ReadChanges { source: DbError::Storage(_), .. }));
    }
}
