//! # Tessera Server
//!
//! Synchronization core of the Tessera document server.
//!
//! This crate provides:
//! - Storage records for clients, documents, changes and snapshots
//! - The [`Database`] trait and an in-memory implementation
//! - The push stage, which deduplicates incoming changes and assigns server
//!   sequences
//! - The pull stage, which answers with missing changes or a snapshot
//! - Snapshot reconstruction by replaying stored changes
//! - [`push_pull`], which runs one full reconciliation cycle
//!
//! # Architecture
//!
//! A push-pull cycle runs against a [`Backend`], which bundles the
//! configuration, the database and the per-document locks:
//!
//! 1. The client sends a pack with its checkpoint and its local changes
//! 2. Changes the server has not seen are accepted and stamped with the next
//!    server sequence of the document
//! 3. Everything the client is missing is read back, either as changes or,
//!    when the client is too far behind, as a snapshot
//! 4. The client's checkpoint is persisted and the response pack returned
//!
//! ```rust,ignore
//! use tessera_server::{push_pull, Backend, BackendConfig, Context};
//!
//! let backend = Backend::with_memory_db(BackendConfig::default())?;
//! let response = push_pull(&Context::new(), &backend, &mut client_info, &doc_info, &request)?;
//! let pack = response.into_change_pack();
//! ```
//!
//! All entry points are synchronous. Callers run cycles for many clients on
//! their own threads; the only state the stages share is each document's
//! server sequence counter.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod backend;
mod config;
mod context;
pub mod db;
mod error;
pub mod packs;

pub use backend::{Backend, DocLock};
pub use config::BackendConfig;
pub use context::{Cancelled, Context};
pub use db::{
    ChangeInfo, ClientDocInfo, ClientInfo, Database, DbError, DbResult, DocId, DocInfo,
    DocumentStatus, MemoryDatabase, SnapshotInfo,
};
pub use error::{ServerError, ServerResult};
pub use packs::{push_pull, Pulled, ServerPack};
