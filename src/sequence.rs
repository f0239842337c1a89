//! Sequence
//!
//! Persistent monotonic counter used to mint primary keys for
//! auto-increment tables. The counter lives as an 8-byte big-endian value
//! under a fixed sentinel key inside the sequence's own prefix.

use crate::error::{OrmError, Result};
use crate::key::decode_u64;
use crate::schema::{PrefixKind, Schema};
use crate::store::{KVStore, PrefixStore};

/// Sentinel sub-key holding the counter
const SEQUENCE_STORAGE_KEY: &[u8] = &[0x01];

/// A persistent counter. Values are never reused, even after rows are deleted.
#[derive(Debug, Clone, Copy)]
pub struct Sequence {
    prefix: u8,
}

impl Sequence {
    /// Create a sequence bound to `prefix`
    pub fn new(schema: &Schema, prefix: u8) -> Result<Self> {
        schema.claim(prefix, PrefixKind::Sequence)?;
        Ok(Self { prefix })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Increment the counter and return the new value (never 0)
    pub fn next_val(&self, store: &dyn KVStore) -> Result<u64> {
        let next = self.peek_next_val(store)?;
        self.store(store)
            .set(SEQUENCE_STORAGE_KEY, &next.to_be_bytes())?;
        tracing::trace!("Sequence 0x{:02x} advanced to {}", self.prefix, next);
        Ok(next)
    }

    /// Last minted value, or 0 if none minted yet
    pub fn cur_val(&self, store: &dyn KVStore) -> Result<u64> {
        match self.store(store).get(SEQUENCE_STORAGE_KEY)? {
            Some(raw) => decode_u64(&raw).map_err(|_| {
                OrmError::Storage(format!(
                    "corrupt sequence value under prefix 0x{:02x}",
                    self.prefix
                ))
            }),
            None => Ok(0),
        }
    }

    /// What `next_val` would return, without mutating state
    pub fn peek_next_val(&self, store: &dyn KVStore) -> Result<u64> {
        self.cur_val(store)?.checked_add(1).ok_or_else(|| {
            OrmError::Storage(format!("sequence 0x{:02x} exhausted", self.prefix))
        })
    }

    /// Seed the counter, e.g. when importing exported table data.
    ///
    /// Fails if the sequence already holds a value.
    pub fn init_val(&self, store: &dyn KVStore, value: u64) -> Result<()> {
        let seq_store = self.store(store);
        if seq_store.has(SEQUENCE_STORAGE_KEY)? {
            return Err(OrmError::InvalidArgument(format!(
                "sequence 0x{:02x} already initialized",
                self.prefix
            )));
        }
        seq_store.set(SEQUENCE_STORAGE_KEY, &value.to_be_bytes())
    }

    fn store<'a>(&self, store: &'a dyn KVStore) -> PrefixStore<'a> {
        PrefixStore::new(store, [self.prefix])
    }
}
