//! Snapshot pulls, reconstruction and storage.

use crate::backend::Backend;
use crate::context::Context;
use crate::db::{ClientInfo, DocInfo, SnapshotInfo};
use crate::error::{ServerError, ServerResult};
use bytes::Bytes;
use tessera_document::{Document, DocumentError};
use tessera_protocol::{ChangePack, Checkpoint};
use tracing::{debug, info, Level};

/// Produces the snapshot a client far behind the document receives.
///
/// The last stored snapshot is returned unchanged if it already covers
/// `initial_server_seq`. Otherwise the document is rebuilt from it and the
/// changes stored after it, and the result is serialized. Nothing is
/// persisted.
pub(crate) fn pull_snapshot(
    ctx: &Context,
    be: &Backend,
    client_info: &ClientInfo,
    doc_info: &DocInfo,
    pushed_cp: Checkpoint,
    initial_server_seq: u64,
) -> ServerResult<(Checkpoint, Bytes)> {
    ctx.check()?;

    let snapshot_info = last_snapshot_info(ctx, be, doc_info)?;
    let cp = pushed_cp.next_server_seq(initial_server_seq);

    if snapshot_info.server_seq >= initial_server_seq {
        info!(
            client = %client_info.id,
            doc = %doc_info.combined_key,
            snapshot_seq = snapshot_info.server_seq,
            cp = %cp,
            "PULL: pulled snapshot without changes"
        );
        return Ok((cp, snapshot_info.snapshot));
    }

    let doc = build_document(ctx, be, doc_info, &snapshot_info, initial_server_seq)?;
    let snapshot = doc
        .serialize_root_to_bytes()
        .map_err(|source| reconstruction(doc_info, initial_server_seq, source))?;

    info!(
        client = %client_info.id,
        doc = %doc_info.combined_key,
        from = snapshot_info.server_seq + 1,
        to = initial_server_seq,
        cp = %cp,
        "PULL: pulled snapshot with changes"
    );
    Ok((cp, snapshot))
}

/// Rebuilds a document at `upto` from `snapshot_info` and the changes
/// stored after it.
///
/// Changes are replayed through [`Document::apply_change_pack`] in ascending
/// server-sequence order, at most `snapshot_replay_chunk` at a time.
/// Cancellation is checked before each chunk. On any failure the partially
/// built document is dropped.
///
/// # Errors
///
/// Returns [`ServerError::Reconstruction`] if the snapshot cannot be loaded
/// or a change cannot be applied, [`ServerError::ReadChanges`] if a chunk
/// cannot be read, and [`ServerError::Cancelled`] if the context is
/// cancelled.
pub fn build_document(
    ctx: &Context,
    be: &Backend,
    doc_info: &DocInfo,
    snapshot_info: &SnapshotInfo,
    upto: u64,
) -> ServerResult<Document> {
    let mut doc = Document::from_snapshot(
        doc_info.key.clone(),
        snapshot_info.server_seq,
        &snapshot_info.snapshot,
    )
    .map_err(|source| reconstruction(doc_info, snapshot_info.server_seq, source))?;

    let chunk = be.config.snapshot_replay_chunk.max(1);
    let mut from = snapshot_info.server_seq + 1;
    while from <= upto {
        ctx.check()?;

        let to = from.saturating_add(chunk - 1).min(upto);
        let changes = be
            .db
            .find_changes_between_server_seqs(ctx, doc_info.id, from, to)
            .map_err(|source| ServerError::ReadChanges {
                doc_key: doc_info.combined_key.clone(),
                from,
                to,
                source,
            })?;
        let pack = ChangePack::new(
            doc_info.key.clone(),
            Checkpoint::INITIAL.next_server_seq(to),
            changes,
            None,
        );
        doc.apply_change_pack(&pack)
            .map_err(|source| reconstruction(doc_info, to, source))?;

        from = to + 1;
    }

    if tracing::enabled!(Level::DEBUG) {
        debug!(
            doc = %doc_info.combined_key,
            server_seq = upto,
            elements = doc.element_map_len(),
            removed = doc.removed_element_len(),
            root = %doc.marshal(),
            "rebuilt document"
        );
    }
    Ok(doc)
}

/// Stores a fresh snapshot once `snapshot_interval` changes accumulated
/// since the last one.
///
/// Must run while the document's push-pull lock is held, so every assigned
/// server sequence up to the current one is either persisted or lost for
/// good. Returns true if a snapshot was stored.
///
/// # Errors
///
/// Returns [`ServerError::ReadSnapshot`] if the last snapshot cannot be
/// read, the errors of [`build_document`], and the database error if the
/// snapshot cannot be written.
pub fn store_snapshot(ctx: &Context, be: &Backend, doc_info: &DocInfo) -> ServerResult<bool> {
    ctx.check()?;

    let last = last_snapshot_info(ctx, be, doc_info)?;
    let server_seq = doc_info.server_seq();
    if server_seq <= last.server_seq || server_seq - last.server_seq < be.config.snapshot_interval
    {
        return Ok(false);
    }

    let doc = build_document(ctx, be, doc_info, &last, server_seq)?;
    be.db.create_snapshot_info(ctx, doc_info.id, &doc)?;

    info!(
        doc = %doc_info.combined_key,
        from = last.server_seq,
        to = server_seq,
        "SNAPSHOT: stored snapshot"
    );
    Ok(true)
}

/// Loads the last stored snapshot of the document, or the initial one.
fn last_snapshot_info(
    ctx: &Context,
    be: &Backend,
    doc_info: &DocInfo,
) -> ServerResult<SnapshotInfo> {
    let last = be
        .db
        .find_last_snapshot_info(ctx, doc_info.id)
        .map_err(|source| ServerError::ReadSnapshot {
            doc_key: doc_info.combined_key.clone(),
            source,
        })?;
    Ok(last.unwrap_or_else(|| SnapshotInfo::initial(doc_info.id)))
}

fn reconstruction(doc_info: &DocInfo, server_seq: u64, source: DocumentError) -> ServerError {
    ServerError::Reconstruction {
        doc_key: doc_info.combined_key.clone(),
        server_seq,
        source,
    }
}
