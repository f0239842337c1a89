//! Prefix store
//!
//! Namespaces a parent store under a fixed key prefix. Every table, index
//! and sequence sees its own keyspace through one of these.

use crate::error::Result;
use crate::key::prefix_end;

use super::{KVStore, StoreIterator};

/// View of `parent` restricted to keys starting with `prefix`
///
/// Keys passed in are relative to the prefix; keys yielded by iterators have
/// the prefix stripped again.
pub struct PrefixStore<'p> {
    parent: &'p dyn KVStore,
    prefix: Vec<u8>,
}

impl<'p> PrefixStore<'p> {
    pub fn new(parent: &'p dyn KVStore, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            parent,
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    /// Translate relative bounds into parent-store bounds
    fn bounds(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> (Vec<u8>, Option<Vec<u8>>) {
        let lower = match start {
            Some(s) => self.full_key(s),
            None => self.prefix.clone(),
        };
        let upper = match end {
            Some(e) => Some(self.full_key(e)),
            None => prefix_end(&self.prefix),
        };
        (lower, upper)
    }

    /// Range scan whose cursor borrows the parent store rather than this view,
    /// so the view itself can be a temporary.
    pub fn scan(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Result<StoreIterator<'p>> {
        let (lower, upper) = self.bounds(start, end);
        let inner = if reverse {
            self.parent.reverse_iterator(Some(lower.as_slice()), upper.as_deref())?
        } else {
            self.parent.iterator(Some(lower.as_slice()), upper.as_deref())?
        };

        let strip = self.prefix.len();
        Ok(Box::new(inner.map(move |item| {
            item.map(|(key, value)| (key[strip..].to_vec(), value))
        })))
    }
}

impl KVStore for PrefixStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.parent.get(&self.full_key(key))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.parent.set(&self.full_key(key), value)
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.parent.delete(&self.full_key(key))
    }

    fn has(&self, key: &[u8]) -> Result<bool> {
        self.parent.has(&self.full_key(key))
    }

    fn iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>> {
        self.scan(start, end, false)
    }

    fn reverse_iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>> {
        self.scan(start, end, true)
    }
}
