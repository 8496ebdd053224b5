//! Backend: configuration, storage and document locks.

use crate::config::BackendConfig;
use crate::db::{Database, DocId, MemoryDatabase};
use crate::error::ServerResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Everything a push-pull cycle runs against.
pub struct Backend {
    /// Backend configuration.
    pub config: BackendConfig,
    /// Storage.
    pub db: Arc<dyn Database>,
    locks: Mutex<HashMap<DocId, DocLock>>,
}

/// Push-pull lock of one document.
pub type DocLock = Arc<Mutex<()>>;

impl Backend {
    /// Creates a backend over `db`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidConfig`](crate::ServerError::InvalidConfig)
    /// if the configuration is invalid.
    pub fn new(config: BackendConfig, db: Arc<dyn Database>) -> ServerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            db,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a backend over a fresh [`MemoryDatabase`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_memory_db(config: BackendConfig) -> ServerResult<Self> {
        Self::new(config, Arc::new(MemoryDatabase::new()))
    }

    /// Returns the push-pull lock of `doc_id`.
    ///
    /// Cycles of different documents never wait on each other. Hand the lock
    /// back with [`Backend::release_document_lock`] once its guard is dropped.
    pub fn document_lock(&self, doc_id: DocId) -> DocLock {
        Arc::clone(self.locks.lock().entry(doc_id).or_default())
    }

    /// Gives back a lock taken with [`Backend::document_lock`].
    ///
    /// The entry of `doc_id` is evicted when no other caller holds it, so the
    /// lock table only tracks documents with a cycle in flight.
    pub fn release_document_lock(&self, doc_id: DocId, lock: DocLock) {
        let mut locks = self.locks.lock();
        let unused = locks
            .get(&doc_id)
            .is_some_and(|held| Arc::ptr_eq(held, &lock) && Arc::strong_count(&lock) == 2);
        if unused {
            locks.remove(&doc_id);
        }
    }

    /// Returns the number of documents with a tracked push-pull lock.
    pub fn document_lock_count(&self) -> usize {
        self.locks.lock().len()
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
