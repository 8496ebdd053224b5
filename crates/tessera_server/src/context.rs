//! Request context and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Marker error returned once a [`Context`] has been cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Per-request context carrying a cancellation signal.
///
/// Clones share the same signal: cancelling any clone cancels them all, so a
/// transport layer can keep one handle and pass another into a push-pull
/// cycle running on a different thread. An optional deadline cancels the
/// context once it has passed.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context that is never cancelled unless asked to.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a context sharing this signal that also expires after
    /// `timeout`.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        // an unrepresentable deadline never expires
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(current), Some(new)) => Some(current.min(new)),
            (current, new) => current.or(new),
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    /// Returns a context that is never cancelled, for writes that must land
    /// once an earlier write of the same cycle has.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self::default()
    }

    /// Cancels the context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if the context was cancelled or its deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns `Err(Cancelled)` if the context is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] once [`Context::cancel`] was called on any clone
    /// or the deadline passed.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}
