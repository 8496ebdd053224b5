//! Push stage: accept new changes and assign server sequences.

use crate::context::Context;
use crate::db::{ClientInfo, DocInfo};
use crate::error::ServerResult;
use tessera_protocol::{Change, ChangePack, Checkpoint};
use tracing::{info, warn};

/// Accepts the changes of `req_pack` the server has not seen yet.
///
/// Starting from the checkpoint stored for the client, every change whose
/// client sequence is above the checkpoint's client sequence gets the next
/// server sequence of the document. Changes at or below it were pushed before
/// (a retry) and are dropped with a warning. Either way the checkpoint's
/// client sequence moves up to the change's, so the returned checkpoint
/// acknowledges everything the client sent.
///
/// Returns the new checkpoint and the accepted changes, stamped, in request
/// order. Nothing is persisted here; sequence numbers handed out are
/// consumed even if the caller later fails to persist the changes.
///
/// # Errors
///
/// Returns [`ServerError::Cancelled`](crate::ServerError::Cancelled) if the
/// context is cancelled before any sequence number is assigned.
pub fn push(
    ctx: &Context,
    client_info: &ClientInfo,
    doc_info: &DocInfo,
    req_pack: &ChangePack,
    initial_server_seq: u64,
) -> ServerResult<(Checkpoint, Vec<Change>)> {
    ctx.check()?;

    let mut cp = client_info.checkpoint(doc_info.id);
    let mut pushed = Vec::with_capacity(req_pack.changes.len());
    for change in &req_pack.changes {
        if change.client_seq() > cp.client_seq {
            let server_seq = doc_info.increase_server_seq();
            cp = cp.next_server_seq(server_seq);
            pushed.push(change.stamped(server_seq));
        } else {
            warn!(
                client = %client_info.id,
                doc = %doc_info.combined_key,
                change_client_seq = change.client_seq(),
                cp_client_seq = cp.client_seq,
                "change already pushed"
            );
        }
        cp = cp.sync_client_seq(change.client_seq());
    }

    if !req_pack.changes.is_empty() {
        info!(
            client = %client_info.id,
            doc = %doc_info.combined_key,
            pushed = pushed.len(),
            rejected = req_pack.changes.len() - pushed.len(),
            from = initial_server_seq,
            to = doc_info.server_seq(),
            cp = %cp,
            "PUSH: pushed changes"
        );
    }

    Ok((cp, pushed))
}
