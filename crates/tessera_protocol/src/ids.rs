//! Client and document identifiers.

use crate::error::{ProtocolError, ProtocolResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a client.
///
/// Client IDs are 128-bit UUIDs. The same ID is used as the actor of the
/// time tickets a client issues, so it also breaks ties between concurrent
/// edits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId([u8; 16]);

impl ClientId {
    /// Creates a client ID from raw bytes.
    #[inline]
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Creates a new random client ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().into_bytes())
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Converts to a UUID.
    #[must_use]
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientId({})", self.to_uuid())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uuid())
    }
}

/// Key of a document: the collection it belongs to and its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocKey {
    /// Collection name.
    pub collection: String,
    /// Document name within the collection.
    pub document: String,
}

impl DocKey {
    const DELIMITER: char = '$';

    /// Creates a document key.
    pub fn new(collection: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document: document.into(),
        }
    }

    /// Returns the single-string form `collection$document`.
    pub fn combined_key(&self) -> String {
        format!("{}{}{}", self.collection, Self::DELIMITER, self.document)
    }

    /// Parses the single-string form produced by [`DocKey::combined_key`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidDocKey`] if the delimiter is missing or
    /// either part is empty.
    pub fn from_combined_key(combined: &str) -> ProtocolResult<Self> {
        match combined.split_once(Self::DELIMITER) {
            Some((collection, document)) if !collection.is_empty() && !document.is_empty() => {
                Ok(Self::new(collection, document))
            }
            _ => Err(ProtocolError::InvalidDocKey(combined.to_string())),
        }
    }
}

impl fmt::Display for DocKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.combined_key())
    }
}
