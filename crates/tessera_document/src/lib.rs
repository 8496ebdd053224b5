//! # Tessera Document
//!
//! The CRDT document that changes are applied to.
//!
//! The root of a document is a map of keys to last-writer-wins registers.
//! Concurrent writes to the same key are settled by [`TimeTicket`] order, so
//! replicas converge no matter in which order they receive changes.
//!
//! The server only consumes three entry points:
//! - [`Document::from_snapshot`] to load a stored snapshot
//! - [`Document::apply_change_pack`] to replay changes, the same path used for
//!   live edits
//! - [`Document::serialize_root_to_bytes`] to produce a new snapshot
//!
//! Clients additionally use [`Document::update`] and
//! [`Document::create_change_pack`] to author changes.
//!
//! [`TimeTicket`]: tessera_protocol::TimeTicket

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod error;
mod root;

pub use document::{ChangeBuilder, Document};
pub use error::{DocumentError, DocumentResult};
pub use root::Root;
