//! Store Module
//!
//! The ordered, byte-keyed key/value store every table, index and sequence
//! is layered on.
//!
//! ## Responsibilities
//! - Point reads and writes (`get`/`set`/`delete`/`has`)
//! - Half-open range iteration `[start, end)`, forward and reverse
//! - Namespacing by key prefix (`PrefixStore`)
//! - Write buffering with commit/discard (`CacheStore`)
//! - Snapshot persistence for the in-memory store
//!
//! ## Iteration Contract
//! `None` bounds are unbounded. Keys come back in lexicographic byte order
//! (or its exact reverse). A cursor is released when the iterator is dropped.

mod cache;
mod memory;
mod prefix;
mod snapshot;

pub use cache::CacheStore;
pub use memory::MemStore;
pub use prefix::PrefixStore;

use std::ops::Bound;

use crate::error::Result;

/// A raw key/value pair yielded by a store cursor
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Cursor over a key range
pub type StoreIterator<'a> = Box<dyn Iterator<Item = Result<KvPair>> + 'a>;

/// Backing store contract consumed by the ORM layer
pub trait KVStore {
    /// Get the value stored under `key`
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove `key` (no-op when absent)
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Check whether `key` exists
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate `[start, end)` in ascending key order
    fn iterator<'a>(&'a self, start: Option<&[u8]>, end: Option<&[u8]>)
        -> Result<StoreIterator<'a>>;

    /// Iterate `[start, end)` in descending key order
    fn reverse_iterator<'a>(
        &'a self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<StoreIterator<'a>>;
}

/// `BTreeMap::range` bounds for `[start, end)`, or `None` for an empty
/// (inverted) range, which `BTreeMap::range` would panic on.
pub(crate) fn range_bounds<'k>(
    start: Option<&'k [u8]>,
    end: Option<&'k [u8]>,
) -> Option<(Bound<&'k [u8]>, Bound<&'k [u8]>)> {
    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            return None;
        }
    }
    Some((
        start.map_or(Bound::Unbounded, Bound::Included),
        end.map_or(Bound::Unbounded, Bound::Excluded),
    ))
}
