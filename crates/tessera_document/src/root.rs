//! Last-writer-wins root map.

use crate::error::{DocumentError, DocumentResult};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_protocol::{Operation, Primitive, TimeTicket};

/// State of one key: the latest write and the ticket that wrote it.
///
/// A removed key keeps its ticket as a tombstone so a stale `Set` that
/// arrives later cannot bring it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Element {
    value: Option<Primitive>,
    updated_at: TimeTicket,
}

/// Root of a document: keys mapped to LWW registers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    elements: BTreeMap<String, Element>,
}

impl Root {
    /// Creates an empty root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a root from snapshot bytes. Empty bytes decode to an empty root.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Snapshot`] if the bytes are not a valid root.
    pub fn from_bytes(bytes: &[u8]) -> DocumentResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::new());
        }
        ciborium::from_reader(bytes).map_err(|e| DocumentError::Snapshot(e.to_string()))
    }

    /// Encodes the root, tombstones included, to snapshot bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Serialize`] if encoding fails.
    pub fn to_bytes(&self) -> DocumentResult<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| DocumentError::Serialize(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    /// Applies one operation stamped with `ticket`.
    ///
    /// Returns true if the operation won against the current state of its key.
    pub fn apply(&mut self, operation: &Operation, ticket: TimeTicket) -> bool {
        let (key, value) = match operation {
            Operation::Set { key, value } => (key, Some(value.clone())),
            Operation::Remove { key } => (key, None),
        };

        match self.elements.get_mut(key) {
            Some(element) if element.updated_at >= ticket => false,
            Some(element) => {
                element.value = value;
                element.updated_at = ticket;
                true
            }
            None => {
                self.elements.insert(
                    key.clone(),
                    Element {
                        value,
                        updated_at: ticket,
                    },
                );
                true
            }
        }
    }

    /// Returns the live value under `key`.
    pub fn get(&self, key: &str) -> Option<&Primitive> {
        self.elements.get(key).and_then(|e| e.value.as_ref())
    }

    /// Returns the live keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.elements
            .iter()
            .filter(|(_, e)| e.value.is_some())
            .map(|(k, _)| k.as_str())
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.elements.len() - self.removed_element_len()
    }

    /// Returns true if no key is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of tracked elements, tombstones included.
    pub fn element_map_len(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of tombstones.
    pub fn removed_element_len(&self) -> usize {
        self.elements.values().filter(|e| e.value.is_none()).count()
    }

    /// Returns the highest lamport clock written into the root.
    pub fn max_lamport(&self) -> u64 {
        self.elements
            .values()
            .map(|e| e.updated_at.lamport)
            .max()
            .unwrap_or(0)
    }

    /// Renders the live values as a JSON object.
    pub fn marshal(&self) -> String {
        let object: serde_json::Map<String, serde_json::Value> = self
            .elements
            .iter()
            .filter_map(|(k, e)| e.value.as_ref().map(|v| (k.clone(), to_json(v))))
            .collect();
        serde_json::Value::Object(object).to_string()
    }
}

fn to_json(value: &Primitive) -> serde_json::Value {
    match value {
        Primitive::Null => serde_json::Value::Null,
        Primitive::Bool(b) => serde_json::Value::Bool(*b),
        Primitive::Integer(n) => serde_json::Value::from(*n),
        Primitive::Text(s) => serde_json::Value::String(s.clone()),
        Primitive::Bytes(b) => serde_json::Value::from(b.clone()),
    }
}
