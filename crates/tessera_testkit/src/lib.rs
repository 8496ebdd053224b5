//! # Tessera Testkit
//!
//! Test utilities for Tessera.
//!
//! This crate provides:
//! - Backend fixtures and a fault-injecting database
//! - Property-based test generators using proptest
//! - A simulated client that runs real push-pull cycles
//! - Concurrent load helpers
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_testkit::prelude::*;
//!
//! #[test]
//! fn two_clients_converge() {
//!     let be = TestBackend::new();
//!     let mut alice = SyncClient::attach(&be, "doc");
//!     let mut bob = SyncClient::attach(&be, "doc");
//!     alice.set("title", "hello");
//!     sync_clients_then_assert_equal(&be, &mut [&mut alice, &mut bob]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod logging;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::logging::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use logging::*;
pub use stress::*;
