//! Indexer
//!
//! Keeps one secondary index in step with its table. For every row the
//! indexer function derives a set of index keys; the indexer persists one
//! entry per key and, on update, touches only the keys that changed.
//!
//! ## Entry Encoding
//! ```text
//! multi-key:  [index key][row id][len(row id): u8]  → (empty)
//! unique:     [index key]                           → row id
//! ```
//! The trailing length byte lets a prefix scan strip the variable-length
//! row id back off an entry without knowing where the index key ends.

use std::collections::BTreeSet;

use crate::error::{OrmError, Result};
use crate::key::RowId;
use crate::store::{KVStore, PrefixStore};

/// Derives the index keys of a row
pub type IndexerFn<T> = Box<dyn Fn(&T) -> Result<Vec<Vec<u8>>> + Send + Sync>;

/// What happens when an index key is added for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPolicy {
    /// Idempotent insert of `index_key ++ row_id ++ len`
    MultiKey,

    /// `index_key → row_id`, rejected if the key already maps to a row
    Unique,
}

/// Maintains the entries of one index under its own prefix
pub struct Indexer<T> {
    prefix: u8,
    indexer_fn: IndexerFn<T>,
    policy: AddPolicy,
}

impl<T> Indexer<T> {
    pub fn new(prefix: u8, indexer_fn: IndexerFn<T>, policy: AddPolicy) -> Self {
        Self {
            prefix,
            indexer_fn,
            policy,
        }
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn policy(&self) -> AddPolicy {
        self.policy
    }

    /// Add entries for every key derived from a new row
    pub fn on_create(&self, store: &dyn KVStore, row_id: &RowId, value: &T) -> Result<()> {
        for key in self.index_keys(value)? {
            self.add(store, &key, row_id)?;
        }
        Ok(())
    }

    /// Apply the minimal diff between the keys of `old` and `new`
    pub fn on_update(&self, store: &dyn KVStore, row_id: &RowId, new: &T, old: &T) -> Result<()> {
        let new_keys = self.index_keys(new)?;
        let old_keys = self.index_keys(old)?;

        for key in old_keys.difference(&new_keys) {
            self.remove(store, key, row_id)?;
        }
        for key in new_keys.difference(&old_keys) {
            self.add(store, key, row_id)?;
        }
        Ok(())
    }

    /// Remove every entry derived from a deleted row
    pub fn on_delete(&self, store: &dyn KVStore, row_id: &RowId, old: &T) -> Result<()> {
        for key in self.index_keys(old)? {
            self.remove(store, &key, row_id)?;
        }
        Ok(())
    }

    /// Derived keys, deduplicated, with empty keys dropped
    fn index_keys(&self, value: &T) -> Result<BTreeSet<Vec<u8>>> {
        Ok((self.indexer_fn)(value)?
            .into_iter()
            .filter(|key| !key.is_empty())
            .collect())
    }

    fn add(&self, store: &dyn KVStore, index_key: &[u8], row_id: &RowId) -> Result<()> {
        let index_store = self.store(store);
        match self.policy {
            AddPolicy::MultiKey => {
                let entry = make_index_entry(index_key, row_id)?;
                if !index_store.has(&entry)? {
                    index_store.set(&entry, &[])?;
                }
            }
            AddPolicy::Unique => {
                if index_store.has(index_key)? {
                    tracing::debug!(
                        "Rejected duplicate key in unique index 0x{:02x} for row {:?}",
                        self.prefix,
                        row_id
                    );
                    return Err(OrmError::UniqueConstraint(format!(
                        "index 0x{:02x} already holds this key",
                        self.prefix
                    )));
                }
                index_store.set(index_key, row_id.as_bytes())?;
            }
        }
        Ok(())
    }

    fn remove(&self, store: &dyn KVStore, index_key: &[u8], row_id: &RowId) -> Result<()> {
        let index_store = self.store(store);
        match self.policy {
            AddPolicy::MultiKey => index_store.delete(&make_index_entry(index_key, row_id)?),
            AddPolicy::Unique => {
                // the key may belong to another row after a rejected write
                match index_store.get(index_key)? {
                    Some(owner) if owner == row_id.as_bytes() => index_store.delete(index_key),
                    _ => Ok(()),
                }
            }
        }
    }

    fn store<'a>(&self, store: &'a dyn KVStore) -> PrefixStore<'a> {
        PrefixStore::new(store, [self.prefix])
    }
}

// =============================================================================
// Entry Encoding
// =============================================================================

/// `index_key ++ row_id ++ len(row_id)`
pub fn make_index_entry(index_key: &[u8], row_id: &RowId) -> Result<Vec<u8>> {
    row_id.validate()?;

    let mut entry = Vec::with_capacity(index_key.len() + row_id.len() + 1);
    entry.extend_from_slice(index_key);
    entry.extend_from_slice(row_id.as_bytes());
    entry.push(row_id.len() as u8);
    Ok(entry)
}

/// Split a multi-key entry back into `(index_key, row_id)`
pub fn split_index_entry(entry: &[u8]) -> Result<(&[u8], RowId)> {
    let (&row_id_len, rest) = entry
        .split_last()
        .ok_or_else(|| OrmError::Storage("empty index entry".to_string()))?;

    let row_id_len = row_id_len as usize;
    if row_id_len == 0 || rest.len() < row_id_len {
        return Err(OrmError::Storage(format!(
            "corrupt index entry: row id length {} exceeds {} bytes",
            row_id_len,
            rest.len()
        )));
    }

    let split = rest.len() - row_id_len;
    Ok((&rest[..split], RowId::from(&rest[split..])))
}
