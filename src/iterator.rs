//! Iterators
//!
//! Typed cursors over table and index ranges.
//!
//! Every cursor is a plain `Iterator<Item = Result<(RowId, T)>>`; the store
//! cursor it wraps is released when it is dropped, on every exit path.
//! [`RowIterator::load_next`] offers the explicit "load next or report done"
//! style on top of that.

use std::marker::PhantomData;

use crate::codec::Persistent;
use crate::config::Config;
use crate::error::{OrmError, Result};
use crate::indexer::split_index_entry;
use crate::key::RowId;
use crate::store::{KVStore, StoreIterator};
use crate::table::RowGetter;

/// A row cursor
pub trait RowIterator<T> {
    /// Load the next row, or `Err(OrmError::IteratorDone)` once exhausted
    fn load_next(&mut self) -> Result<(RowId, T)>;
}

impl<T, I> RowIterator<T> for I
where
    I: Iterator<Item = Result<(RowId, T)>>,
{
    fn load_next(&mut self) -> Result<(RowId, T)> {
        self.next().unwrap_or(Err(OrmError::IteratorDone))
    }
}

// =============================================================================
// Table Iterator
// =============================================================================

/// Iterates rows of one table, decoding each stored value
pub struct TableIterator<'a, T> {
    inner: StoreIterator<'a>,
    _row: PhantomData<fn() -> T>,
}

impl<'a, T> TableIterator<'a, T> {
    pub(crate) fn new(inner: StoreIterator<'a>) -> Self {
        Self {
            inner,
            _row: PhantomData,
        }
    }
}

impl<T: Persistent> Iterator for TableIterator<'_, T> {
    type Item = Result<(RowId, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        Some(item.and_then(|(key, value)| Ok((RowId::from(key), T::unmarshal(&value)?))))
    }
}

// =============================================================================
// Index Iterator
// =============================================================================

/// How raw index entries map back to row ids
pub(crate) enum EntryLayout {
    /// `index_key ++ row_id ++ len(row_id)` → empty. With `exact` set, only
    /// entries whose index key equals it are yielded.
    MultiKey { exact: Option<Vec<u8>> },

    /// `index_key` → row id
    Unique,
}

/// Iterates index entries and joins each back to its primary table row
pub struct IndexIterator<'a, T> {
    store: &'a dyn KVStore,
    inner: StoreIterator<'a>,
    rows: RowGetter<T>,
    layout: EntryLayout,
}

impl<'a, T> IndexIterator<'a, T> {
    pub(crate) fn new(
        store: &'a dyn KVStore,
        inner: StoreIterator<'a>,
        rows: RowGetter<T>,
        layout: EntryLayout,
    ) -> Self {
        Self {
            store,
            inner,
            rows,
            layout,
        }
    }
}

impl<T: Persistent> Iterator for IndexIterator<'_, T> {
    type Item = Result<(RowId, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (key, value) = match self.inner.next()? {
                Ok(kv) => kv,
                Err(e) => return Some(Err(e)),
            };

            let row_id = match &self.layout {
                EntryLayout::MultiKey { exact } => match split_index_entry(&key) {
                    Ok((index_key, _)) if matches!(exact, Some(e) if e.as_slice() != index_key) => {
                        continue
                    }
                    Ok((_, row_id)) => row_id,
                    Err(e) => return Some(Err(e)),
                },
                EntryLayout::Unique => RowId::from(value),
            };

            return Some(self.rows.get(self.store, &row_id).map(|row| (row_id, row)));
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// First row of a cursor, `NotFound` if it is empty
pub fn first<T, I>(mut it: I) -> Result<(RowId, T)>
where
    I: Iterator<Item = Result<(RowId, T)>>,
{
    match it.load_next() {
        Err(OrmError::IteratorDone) => Err(OrmError::NotFound),
        other => other,
    }
}

/// Drain a cursor into a vector, stopping at the first error
pub fn read_all<T, I>(it: I) -> Result<Vec<(RowId, T)>>
where
    I: Iterator<Item = Result<(RowId, T)>>,
{
    it.collect()
}

/// Page request: resume at `key` (inclusive), return at most `limit` rows.
/// A zero limit means the configured default.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub key: Option<RowId>,
    pub limit: usize,
}

impl PageRequest {
    pub fn effective_limit(&self, config: &Config) -> usize {
        if self.limit == 0 {
            config.default_page_limit
        } else {
            self.limit
        }
    }
}

/// One page of rows plus the key to resume from, if more remain
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<(RowId, T)>,
    pub next_key: Option<RowId>,
}

/// Read up to `limit` rows; `next_key` is the row id of the first row left unread.
pub fn paginate<T, I>(it: I, limit: usize) -> Result<Page<T>>
where
    I: Iterator<Item = Result<(RowId, T)>>,
{
    if limit == 0 {
        return Err(OrmError::InvalidArgument("page limit must be positive".to_string()));
    }

    let mut rows = Vec::with_capacity(limit);
    let mut next_key = None;
    for item in it {
        let (row_id, row) = item?;
        if rows.len() == limit {
            next_key = Some(row_id);
            break;
        }
        rows.push((row_id, row));
    }

    Ok(Page { rows, next_key })
}
