//! # Tessera Protocol
//!
//! Value types exchanged between Tessera clients and the sync server.
//!
//! This crate provides:
//! - `Checkpoint`, the paired client/server sequence watermark
//! - `Change` and its identifiers (`ChangeId`, `TimeTicket`)
//! - `ChangePack`, a batch of changes plus the checkpoint it was built under
//! - Document and client identifiers
//!
//! This is a pure value crate with no I/O. Every transform returns a new
//! value, so "before" and "after" states can be logged side by side.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod checkpoint;
mod error;
mod ids;
mod pack;

pub use change::{Change, ChangeId, Operation, Primitive, TimeTicket};
pub use checkpoint::Checkpoint;
pub use error::{ProtocolError, ProtocolResult};
pub use ids::{ClientId, DocKey};
pub use pack::ChangePack;
