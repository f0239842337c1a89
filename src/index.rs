//! Secondary Indexes
//!
//! Lookup structures derived from table rows. An index is constructed by
//! wrapping the table's builder; it registers interceptors there so every
//! create/save/delete on the table keeps the index current.
//!
//! - [`MultiKeyIndex`]: each row yields zero or more keys, keys may repeat
//!   across rows
//! - [`UniqueIndex`]: each row yields at most one key, a key maps to at most
//!   one row
//! - [`UInt64Index`]: multi-key index over `u64` keys (big-endian encoded)
//!
//! Lookups return iterators that resolve each entry back to its table row.

use std::sync::Arc;

use crate::codec::Persistent;
use crate::error::{OrmError, Result};
use crate::indexer::{split_index_entry, AddPolicy, Indexer, IndexerFn};
use crate::iterator::{first, EntryLayout, IndexIterator};
use crate::key::{check_range, encode_u64, prefix_end, RowId};
use crate::schema::PrefixKind;
use crate::store::{KVStore, PrefixStore};
use crate::table::{Indexable, RowGetter};

/// Lookup operations shared by every index kind
pub trait Index<T> {
    /// Whether any row is indexed under exactly `key`
    fn has(&self, store: &dyn KVStore, key: &[u8]) -> Result<bool>;

    /// Rows indexed under exactly `key`
    fn get<'a>(&self, store: &'a dyn KVStore, key: &[u8]) -> Result<IndexIterator<'a, T>>;

    /// Rows whose index key lies in `[start, end)`, ascending by index key
    fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<IndexIterator<'a, T>>;

    /// Rows whose index key lies in `[start, end)`, descending by index key
    fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<IndexIterator<'a, T>>;
}

/// Build the indexer and hook it into the table's interceptor chain
fn register<T, B>(builder: &mut B, indexer: Indexer<T>)
where
    T: Persistent + 'static,
    B: Indexable<T>,
{
    let indexer = Arc::new(indexer);

    let on_save = Arc::clone(&indexer);
    builder.add_after_save_interceptor(Box::new(
        move |store: &dyn KVStore, row_id: &RowId, new: &T, old: Option<&T>| match old {
            None => on_save.on_create(store, row_id, new),
            Some(old) => on_save.on_update(store, row_id, new, old),
        },
    ));

    let on_delete = indexer;
    builder.add_after_delete_interceptor(Box::new(
        move |store: &dyn KVStore, row_id: &RowId, old: &T| on_delete.on_delete(store, row_id, old),
    ));
}

fn require_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(OrmError::InvalidArgument("empty index key".to_string()));
    }
    Ok(())
}

// =============================================================================
// Multi-Key Index
// =============================================================================

/// Index where a row may appear under many keys and a key under many rows
pub struct MultiKeyIndex<T> {
    prefix: u8,
    rows: RowGetter<T>,
}

impl<T> Clone for MultiKeyIndex<T> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            rows: self.rows,
        }
    }
}

impl<T: Persistent + 'static> MultiKeyIndex<T> {
    /// Attach a new index under `prefix` to the table being built
    pub fn new<B, F>(builder: &mut B, prefix: u8, indexer_fn: F) -> Result<Self>
    where
        B: Indexable<T>,
        F: Fn(&T) -> Result<Vec<Vec<u8>>> + Send + Sync + 'static,
    {
        builder.schema().claim(prefix, PrefixKind::Index)?;
        let rows = builder.row_getter();
        let indexer_fn: IndexerFn<T> = Box::new(indexer_fn);
        register(builder, Indexer::new(prefix, indexer_fn, AddPolicy::MultiKey));
        Ok(Self { prefix, rows })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
        exact: Option<Vec<u8>>,
    ) -> Result<IndexIterator<'a, T>> {
        let inner = PrefixStore::new(store, [self.prefix]).scan(start, end, reverse)?;
        Ok(IndexIterator::new(store, inner, self.rows, EntryLayout::MultiKey { exact }))
    }
}

impl<T: Persistent + 'static> Index<T> for MultiKeyIndex<T> {
    fn has(&self, store: &dyn KVStore, key: &[u8]) -> Result<bool> {
        require_key(key)?;
        let end = prefix_end(key);
        let index_store = PrefixStore::new(store, [self.prefix]);
        for item in index_store.scan(Some(key), end.as_deref(), false)? {
            let (entry, _) = item?;
            if split_index_entry(&entry)?.0 == key {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get<'a>(&self, store: &'a dyn KVStore, key: &[u8]) -> Result<IndexIterator<'a, T>> {
        require_key(key)?;
        let end = prefix_end(key);
        self.scan(store, Some(key), end.as_deref(), false, Some(key.to_vec()))
    }

    fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<IndexIterator<'a, T>> {
        check_range(start, end)?;
        self.scan(store, start, end, false, None)
    }

    fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<IndexIterator<'a, T>> {
        check_range(start, end)?;
        self.scan(store, start, end, true, None)
    }
}

// =============================================================================
// Unique Index
// =============================================================================

/// Index where every key maps to at most one row
pub struct UniqueIndex<T> {
    prefix: u8,
    rows: RowGetter<T>,
}

impl<T> Clone for UniqueIndex<T> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            rows: self.rows,
        }
    }
}

impl<T: Persistent + 'static> UniqueIndex<T> {
    /// Attach a new unique index under `prefix`. An empty derived key means
    /// the row is not indexed.
    pub fn new<B, F>(builder: &mut B, prefix: u8, indexer_fn: F) -> Result<Self>
    where
        B: Indexable<T>,
        F: Fn(&T) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        builder.schema().claim(prefix, PrefixKind::Index)?;
        let rows = builder.row_getter();
        let multi: IndexerFn<T> = Box::new(move |value: &T| Ok(vec![indexer_fn(value)?]));
        register(builder, Indexer::new(prefix, multi, AddPolicy::Unique));
        Ok(Self { prefix, rows })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Row id stored under `key`
    pub fn get_row_id(&self, store: &dyn KVStore, key: &[u8]) -> Result<RowId> {
        require_key(key)?;
        PrefixStore::new(store, [self.prefix])
            .get(key)?
            .map(RowId::from)
            .ok_or(OrmError::NotFound)
    }

    /// The row stored under `key`
    pub fn get_one(&self, store: &dyn KVStore, key: &[u8]) -> Result<(RowId, T)> {
        first(self.get(store, key)?)
    }

    fn scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Result<IndexIterator<'a, T>> {
        let inner = PrefixStore::new(store, [self.prefix]).scan(start, end, reverse)?;
        Ok(IndexIterator::new(store, inner, self.rows, EntryLayout::Unique))
    }
}

impl<T: Persistent + 'static> Index<T> for UniqueIndex<T> {
    fn has(&self, store: &dyn KVStore, key: &[u8]) -> Result<bool> {
        require_key(key)?;
        PrefixStore::new(store, [self.prefix]).has(key)
    }

    fn get<'a>(&self, store: &'a dyn KVStore, key: &[u8]) -> Result<IndexIterator<'a, T>> {
        require_key(key)?;
        // [key, key ++ 0x00) holds exactly `key`
        let mut end = key.to_vec();
        end.push(0x00);
        self.scan(store, Some(key), Some(end.as_slice()), false)
    }

    fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<IndexIterator<'a, T>> {
        check_range(start, end)?;
        self.scan(store, start, end, false)
    }

    fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<IndexIterator<'a, T>> {
        check_range(start, end)?;
        self.scan(store, start, end, true)
    }
}

// =============================================================================
// UInt64 Index
// =============================================================================

/// Multi-key index over `u64` keys
pub struct UInt64Index<T> {
    inner: MultiKeyIndex<T>,
}

impl<T> Clone for UInt64Index<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Persistent + 'static> UInt64Index<T> {
    pub fn new<B, F>(builder: &mut B, prefix: u8, indexer_fn: F) -> Result<Self>
    where
        B: Indexable<T>,
        F: Fn(&T) -> Result<Vec<u64>> + Send + Sync + 'static,
    {
        let inner = MultiKeyIndex::new(builder, prefix, move |value: &T| {
            Ok(indexer_fn(value)?
                .into_iter()
                .map(|k| encode_u64(k).to_vec())
                .collect())
        })?;
        Ok(Self { inner })
    }

    pub fn has(&self, store: &dyn KVStore, key: u64) -> Result<bool> {
        self.inner.has(store, &encode_u64(key))
    }

    pub fn get<'a>(&self, store: &'a dyn KVStore, key: u64) -> Result<IndexIterator<'a, T>> {
        self.inner.get(store, &encode_u64(key))
    }

    /// Rows whose key lies in `[start, end)`
    pub fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: u64,
        end: u64,
    ) -> Result<IndexIterator<'a, T>> {
        self.inner
            .prefix_scan(store, Some(&encode_u64(start)[..]), Some(&encode_u64(end)[..]))
    }

    pub fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: u64,
        end: u64,
    ) -> Result<IndexIterator<'a, T>> {
        self.inner
            .reverse_prefix_scan(store, Some(&encode_u64(start)[..]), Some(&encode_u64(end)[..]))
    }

    /// The underlying byte-keyed index (e.g. for registering with a query router)
    pub fn as_multi_key(&self) -> &MultiKeyIndex<T> {
        &self.inner
    }
}
