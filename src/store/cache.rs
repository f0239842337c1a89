//! Cache store
//!
//! Write buffer layered over a parent store. Reads see buffered writes
//! first, then the parent; nothing reaches the parent until [`CacheStore::write`].
//!
//! Run one logical operation (a create/save/delete plus every index update
//! it triggers) against a `CacheStore` and either commit it or drop it, and
//! a failure half-way leaves the parent untouched.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;

use super::{range_bounds, KVStore, KvPair, StoreIterator};

/// Buffered mutation
#[derive(Debug, Clone, PartialEq)]
enum CacheEntry {
    /// A pending value
    Value(Vec<u8>),

    /// A pending delete
    Tombstone,
}

/// Write-buffering view of a parent store
pub struct CacheStore<'p> {
    parent: &'p dyn KVStore,
    writes: RwLock<BTreeMap<Vec<u8>, CacheEntry>>,
}

impl<'p> CacheStore<'p> {
    pub fn new(parent: &'p dyn KVStore) -> Self {
        Self {
            parent,
            writes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of buffered sets and deletes
    pub fn pending_writes(&self) -> usize {
        self.writes.read().len()
    }

    /// Apply every buffered mutation to the parent, in key order
    pub fn write(self) -> Result<()> {
        let writes = self.writes.into_inner();
        let count = writes.len();
        for (key, entry) in writes {
            match entry {
                CacheEntry::Value(value) => self.parent.set(&key, &value)?,
                CacheEntry::Tombstone => self.parent.delete(&key)?,
            }
        }
        tracing::trace!("Committed {} buffered writes", count);
        Ok(())
    }

    /// Drop every buffered mutation
    pub fn discard(self) {
        tracing::trace!("Discarded {} buffered writes", self.pending_writes());
    }

    /// Parent range with the buffered writes applied on top
    fn merged(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<Vec<KvPair>> {
        let Some(bounds) = range_bounds(start, end) else {
            return Ok(Vec::new());
        };

        let mut merged = BTreeMap::new();
        for item in self.parent.iterator(start, end)? {
            let (key, value) = item?;
            merged.insert(key, value);
        }

        for (key, entry) in self.writes.read().range::<[u8], _>(bounds) {
            match entry {
                CacheEntry::Value(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                CacheEntry::Tombstone => {
                    merged.remove(key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }
}

impl KVStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.read().get(key) {
            Some(CacheEntry::Value(value)) => Ok(Some(value.clone())),
            Some(CacheEntry::Tombstone) => Ok(None),
            None => self.parent.get(key),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes
            .write()
            .insert(key.to_vec(), CacheEntry::Value(value.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.writes.write().insert(key.to_vec(), CacheEntry::Tombstone);
        Ok(())
    }

    fn iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>> {
        let entries = self.merged(start, end)?;
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn reverse_iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>> {
        let entries = self.merged(start, end)?;
        Ok(Box::new(entries.into_iter().rev().map(Ok)))
    }
}
