//! Row codec
//!
//! Rows are persisted as opaque bytes. A row type opts in by implementing
//! [`Persistent`]; the default Marshal/Unmarshal pair uses bincode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{OrmError, Result};

/// A value that can be stored as a table row.
///
/// `Serialize` is also what the query façade and table export use to produce
/// the JSON representation, independent of the storage encoding below.
pub trait Persistent: Serialize + DeserializeOwned {
    /// Encode the row for storage
    fn marshal(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| OrmError::Serialization(format!("marshal failed: {}", e)))
    }

    /// Decode a stored row
    fn unmarshal(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| OrmError::Serialization(format!("unmarshal failed: {}", e)))
    }
}

/// Canonical external (JSON) representation of a row
pub fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| OrmError::Serialization(e.to_string()))
}
