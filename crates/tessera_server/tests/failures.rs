//! Storage failures and cancellation.

use std::time::Duration;
use tessera_protocol::{ChangePack, Checkpoint};
use tessera_server::{push_pull, BackendConfig, Context, DbError, ServerError};
use tessera_testkit::prelude::*;

#[test]
fn failed_range_read_carries_context() {
    init_tracing();
    let (be, db) = TestBackend::flaky(BackendConfig::default());
    let doc = be.doc("doc");
    be.seed_changes(&doc, "k", 3);
    let mut client = be.attached_client(&doc);

    db.fail_change_reads(true);
    let req = ChangePack::request(doc.key.clone(), Checkpoint::INITIAL, vec![]);
    let err = push_pull(&be.ctx, &be, &mut client, &doc, &req).unwrap_err();

    match &err {
        ServerError::ReadChanges {
            doc_key,
            from,
            to,
            source,
        } => {
            assert_eq!(doc_key, "test$doc");
            assert_eq!((*from, *to), (1, 3));
            assert!(matches!(source, DbError::Storage(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_retryable());
    assert_eq!(be.reload_client(client.id).checkpoint(doc.id), Checkpoint::INITIAL);

    db.fail_change_reads(false);
    let resp = push_pull(&be.ctx, &be, &mut client, &doc, &req).unwrap();
    assert_eq!(resp.changes_len(), 3);
}

#[test]
fn failed_change_write_burns_sequences() {
    let (be, db) = TestBackend::flaky(BackendConfig::default());
    let mut client = SyncClient::attach(&be, "doc");
    client.set("a", 1i64);
    client.set("b", 2i64);

    db.fail_change_writes(true);
    let err = client.sync(&be).unwrap_err();
    assert!(matches!(err, ServerError::Database(DbError::Storage(_))));
    assert!(!err.is_retryable());
    assert_eq!(client.doc_info.server_seq(), 2);
    assert!(be.stored_changes(&client.doc_info).is_empty());
    assert!(client.doc.has_local_changes());

    // the resent changes get fresh numbers
    db.fail_change_writes(false);
    let resp = client.sync(&be).unwrap();
    assert_eq!(resp.checkpoint, Checkpoint::new(4, 2));
    let seqs: Vec<_> = be
        .stored_changes(&client.doc_info)
        .iter()
        .map(|c| c.server_seq)
        .collect();
    assert_eq!(seqs, vec![3, 4]);
    assert!(!client.doc.has_local_changes());
}

#[test]
fn failed_pull_after_push_does_not_duplicate_on_retry() {
    let (be, db) = TestBackend::flaky(BackendConfig::default());
    let doc = be.doc("doc");
    be.seed_changes(&doc, "seed", 2);
    let mut client = SyncClient::attach(&be, "doc");
    client.set("mine", true);

    db.fail_change_reads(true);
    assert!(client.sync(&be).is_err());
    assert_eq!(be.reload_client(client.info.id).checkpoint(doc.id), Checkpoint::new(3, 1));

    db.fail_change_reads(false);
    let resp = client.sync(&be).unwrap();
    assert_eq!(doc.server_seq(), 3);
    assert_eq!(be.stored_changes(&doc).len(), 3);
    assert_eq!(resp.checkpoint, Checkpoint::new(3, 1));
    assert_eq!(client.marshal(), r#"{"mine":true,"seed":2}"#);
}

#[test]
fn failed_snapshot_write_does_not_fail_the_cycle() {
    let (be, db) = TestBackend::flaky(BackendConfig::new().with_snapshot_interval(1));
    let mut client = SyncClient::attach(&be, "doc");
    client.set("a", 1i64);

    db.fail_snapshot_writes(true);
    client.sync(&be).unwrap();
    assert_eq!(db.inner().snapshot_count(client.doc_info.id), 0);

    db.fail_snapshot_writes(false);
    client.set("a", 2i64);
    client.sync(&be).unwrap();
    assert_eq!(db.inner().snapshot_count(client.doc_info.id), 1);
}

#[test]
fn failed_client_write_propagates_unchanged() {
    let (be, db) = TestBackend::flaky(BackendConfig::default());
    let mut client = SyncClient::attach(&be, "doc");

    db.fail_client_writes(true);
    let err = client.sync(&be).unwrap_err();
    assert!(matches!(
        err,
        ServerError::Database(DbError::Storage(ref msg)) if msg.contains("client write")
    ));
}

#[test]
fn cancelled_cycle_assigns_nothing() {
    let be = TestBackend::new();
    let mut client = SyncClient::attach(&be, "doc");
    client.set("a", 1i64);

    let ctx = Context::new();
    ctx.cancel();
    let err = client.sync_with(&ctx, &be).unwrap_err();
    assert!(err.is_cancelled());
    assert!(err.is_retryable());
    assert_eq!(client.doc_info.server_seq(), 0);
    assert!(be.stored_changes(&client.doc_info).is_empty());
    assert_eq!(client.checkpoint(), Checkpoint::INITIAL);
}

#[test]
fn expired_deadline_cancels_the_cycle() {
    let be = TestBackend::new();
    let mut client = SyncClient::attach(&be, "doc");

    let ctx = Context::new().with_timeout(Duration::ZERO);
    let err = client.sync_with(&ctx, &be).unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn failed_snapshot_read_carries_document_key() {
    let (be, db) = TestBackend::flaky(BackendConfig::new().with_snapshot_threshold(1));
    let doc = be.doc("doc");
    be.seed_changes(&doc, "k", 3);
    let mut client = be.attached_client(&doc);

    db.fail_snapshot_reads(true);
    let req = ChangePack::request(doc.key.clone(), Checkpoint::INITIAL, vec![]);
    let err = push_pull(&be.ctx, &be, &mut client, &doc, &req).unwrap_err();

    match &err {
        ServerError::ReadSnapshot { doc_key, source } => {
            assert_eq!(doc_key, "test$doc");
            assert!(matches!(source, DbError::Storage(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("test$doc"));
    assert!(err.is_retryable());

    db.fail_snapshot_reads(false);
    let resp = push_pull(&be.ctx, &be, &mut client, &doc, &req).unwrap();
    assert!(resp.is_snapshot());
}

#[test]
fn cancel_after_change_write_keeps_retry_idempotent() {
    let (be, db) = TestBackend::flaky(BackendConfig::default());
    let mut client = SyncClient::attach(&be, "doc");
    client.set("a", 1i64);

    db.cancel_after_change_writes(true);
    let ctx = Context::new();
    let err = client.sync_with(&ctx, &be).unwrap_err();
    assert!(err.is_cancelled());

    // the stored changes are acknowledged even though the cycle was cancelled
    let doc = &client.doc_info.clone();
    assert_eq!(be.reload_client(client.info.id).checkpoint(doc.id), Checkpoint::new(1, 1));
    assert_eq!(be.stored_changes(doc).len(), 1);

    db.cancel_after_change_writes(false);
    let resp = client.sync(&be).unwrap();
    assert_eq!(resp.checkpoint, Checkpoint::new(1, 1));
    let stored: Vec<_> = be
        .stored_changes(doc)
        .iter()
        .map(|c| (c.server_seq, c.client_seq))
        .collect();
    assert_eq!(stored, vec![(1, 1)]);
    assert_eq!(doc.server_seq(), 1);
}

#[test]
fn cancel_after_final_checkpoint_write_skips_snapshot() {
    let (be, db) = TestBackend::flaky(BackendConfig::new().with_snapshot_interval(1));
    let doc = be.doc("doc");
    be.seed_changes(&doc, "k", 2);
    let mut client = SyncClient::attach(&be, "doc");
    client.set("mine", true);

    // the write after the push runs detached, so only the last one cancels
    db.cancel_after_client_writes(true);
    let ctx = Context::new();
    let resp = client.sync_with(&ctx, &be).unwrap();
    assert!(ctx.is_cancelled());
    assert_eq!(resp.checkpoint, Checkpoint::new(3, 1));
    assert_eq!(be.reload_client(client.info.id).checkpoint(doc.id), Checkpoint::new(3, 1));
    assert_eq!(db.inner().snapshot_count(doc.id), 0);

    db.cancel_after_client_writes(false);
    client.sync(&be).unwrap();
    assert_eq!(db.inner().snapshot_count(doc.id), 1);
    assert_eq!(be.stored_changes(&doc).len(), 3);
}
