//! Key primitives
//!
//! Row identifiers and the byte-level helpers shared by tables, indexes
//! and the query façade.
//!
//! ## Key Layout
//! ```text
//! table row:      [table prefix (1)][row id]
//! multi index:    [index prefix (1)][index key][row id][len(row id) (1)]
//! unique index:   [index prefix (1)][index key]          -> row id
//! sequence:       [sequence prefix (1)][0x01]            -> u64 (BE)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, Result};

/// Longest row id an index entry can carry (its length is stored in one byte)
pub const MAX_ROW_ID_LEN: usize = u8::MAX as usize;

/// Opaque, ordered byte string addressing a row within a table
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RowId(Vec<u8>);

impl RowId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode a numeric row id (8-byte big-endian)
    pub fn to_u64(&self) -> Result<u64> {
        decode_u64(&self.0)
    }

    /// Row ids are stored as index entry suffixes, so they must be non-empty
    /// and fit the one-byte length trailer.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(OrmError::InvalidArgument("empty row id".to_string()));
        }
        if self.0.len() > MAX_ROW_ID_LEN {
            return Err(OrmError::InvalidArgument(format!(
                "row id too long: {} bytes (max {})",
                self.0.len(),
                MAX_ROW_ID_LEN
            )));
        }
        Ok(())
    }
}

impl From<u64> for RowId {
    fn from(id: u64) -> Self {
        Self(encode_u64(id).to_vec())
    }
}

impl From<Vec<u8>> for RowId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for RowId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl AsRef<[u8]> for RowId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", hex::encode(&self.0))
    }
}

// =============================================================================
// Numeric Keys
// =============================================================================

/// Encode a u64 as an order-preserving 8-byte key
pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Decode an 8-byte big-endian key
pub fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        OrmError::InvalidArgument(format!(
            "expected 8-byte numeric key, got {} bytes",
            bytes.len()
        ))
    })?;
    Ok(u64::from_be_bytes(raw))
}

// =============================================================================
// Range Helpers
// =============================================================================

/// Smallest key strictly greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (empty prefix or all `0xFF`),
/// which callers treat as "unbounded high".
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Reject `[start, end)` ranges where both bounds are set and `start >= end`.
pub fn check_range(start: Option<&[u8]>, end: Option<&[u8]>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(OrmError::InvalidArgument(
                "start must be less than end".to_string(),
            ));
        }
    }
    Ok(())
}
