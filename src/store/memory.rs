//! In-memory store
//!
//! BTreeMap-based ordered store with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;

use super::{range_bounds, KVStore, KvPair, StoreIterator};

/// Ordered in-memory key/value store
///
/// Range iterators copy the selected range out under a read lock, so a
/// caller may mutate the store while walking a cursor (e.g. delete every row
/// it visits) without deadlocking.
#[derive(Debug, Default)]
pub struct MemStore {
    /// Sorted key → value map
    pub(super) data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy out every entry in key order
    pub fn entries(&self) -> Vec<KvPair> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Collect `[start, end)` under a single read lock
    fn range(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Vec<KvPair> {
        let Some(bounds) = range_bounds(start, end) else {
            return Vec::new();
        };

        self.data
            .read()
            .range::<[u8], _>(bounds)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl KVStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.data.read().contains_key(key))
    }

    fn iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>> {
        let entries = self.range(start, end);
        Ok(Box::new(entries.into_iter().map(Ok)))
    }

    fn reverse_iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>> {
        let entries = self.range(start, end);
        Ok(Box::new(entries.into_iter().rev().map(Ok)))
    }
}
