//! Table
//!
//! Primary storage: maps a row id to a serialized row under a fixed
//! single-byte namespace prefix.
//!
//! ## Responsibilities
//! - Create / save / delete rows, loading the old value first so
//!   interceptors can compute deltas
//! - Existence checks and point lookups
//! - Half-open prefix scans in both directions
//! - Fire after-save / after-delete interceptors (secondary indexes) in
//!   registration order, within the same logical write
//!
//! Tables are assembled with a [`TableBuilder`]; indexes hook into the
//! builder before [`TableBuilder::build`] seals the interceptor list.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::Persistent;
use crate::config::Config;
use crate::error::{OrmError, Result};
use crate::iterator::{paginate, Page, PageRequest, TableIterator};
use crate::key::{check_range, RowId};
use crate::schema::{PrefixKind, Schema};
use crate::store::{KVStore, PrefixStore};

/// Called after a row is written: `(store, row_id, new_value, old_value)`.
/// `old_value` is `None` on create.
pub type AfterSaveInterceptor<T> =
    Box<dyn Fn(&dyn KVStore, &RowId, &T, Option<&T>) -> Result<()> + Send + Sync>;

/// Called after a row is removed: `(store, row_id, old_value)`
pub type AfterDeleteInterceptor<T> =
    Box<dyn Fn(&dyn KVStore, &RowId, &T) -> Result<()> + Send + Sync>;

/// Something an index can attach itself to while a table is being built
pub trait Indexable<T> {
    /// Registry the index claims its own prefix in
    fn schema(&self) -> &Schema;

    /// Type-safe access to the rows of the table under construction
    fn row_getter(&self) -> RowGetter<T>;

    fn add_after_save_interceptor(&mut self, interceptor: AfterSaveInterceptor<T>);

    fn add_after_delete_interceptor(&mut self, interceptor: AfterDeleteInterceptor<T>);
}

// =============================================================================
// Row Getter
// =============================================================================

/// Fetches and decodes rows of one table by raw row id
pub struct RowGetter<T> {
    prefix: u8,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for RowGetter<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RowGetter<T> {}

impl<T: Persistent> RowGetter<T> {
    pub(crate) fn new(prefix: u8) -> Self {
        Self {
            prefix,
            _row: PhantomData,
        }
    }

    /// Load the row stored under `row_id`
    pub fn get(&self, store: &dyn KVStore, row_id: &RowId) -> Result<T> {
        match PrefixStore::new(store, [self.prefix]).get(row_id.as_bytes())? {
            Some(bytes) => T::unmarshal(&bytes),
            None => Err(OrmError::NotFound),
        }
    }
}

// =============================================================================
// Table Builder
// =============================================================================

/// Collects interceptors before a [`Table`] is sealed
pub struct TableBuilder<'s, T> {
    schema: &'s Schema,
    prefix: u8,
    after_save: Vec<AfterSaveInterceptor<T>>,
    after_delete: Vec<AfterDeleteInterceptor<T>>,
}

impl<'s, T: Persistent> TableBuilder<'s, T> {
    /// Start a table under `prefix`; fails if the prefix is already taken
    pub fn new(schema: &'s Schema, prefix: u8) -> Result<Self> {
        schema.claim(prefix, PrefixKind::Table)?;
        Ok(Self {
            schema,
            prefix,
            after_save: Vec::new(),
            after_delete: Vec::new(),
        })
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Seal the interceptor list and return the table
    pub fn build(self) -> Table<T> {
        Table {
            prefix: self.prefix,
            after_save: Arc::from(self.after_save),
            after_delete: Arc::from(self.after_delete),
        }
    }
}

impl<T: Persistent> Indexable<T> for TableBuilder<'_, T> {
    fn schema(&self) -> &Schema {
        self.schema
    }

    fn row_getter(&self) -> RowGetter<T> {
        RowGetter::new(self.prefix)
    }

    fn add_after_save_interceptor(&mut self, interceptor: AfterSaveInterceptor<T>) {
        self.after_save.push(interceptor);
    }

    fn add_after_delete_interceptor(&mut self, interceptor: AfterDeleteInterceptor<T>) {
        self.after_delete.push(interceptor);
    }
}

// =============================================================================
// Table
// =============================================================================

/// A row as it appears in a table export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRow<T> {
    pub id: RowId,
    pub value: T,
}

/// Primary storage for rows of type `T`
///
/// Cloning is cheap; clones share the interceptor list.
pub struct Table<T> {
    prefix: u8,
    after_save: Arc<[AfterSaveInterceptor<T>]>,
    after_delete: Arc<[AfterDeleteInterceptor<T>]>,
}

impl<T> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            after_save: Arc::clone(&self.after_save),
            after_delete: Arc::clone(&self.after_delete),
        }
    }
}

impl<T: Persistent> Table<T> {
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn row_getter(&self) -> RowGetter<T> {
        RowGetter::new(self.prefix)
    }

    /// Store a new row. Fails with `UniqueConstraint` if `row_id` is taken.
    pub fn create(&self, store: &dyn KVStore, row_id: &RowId, value: &T) -> Result<()> {
        row_id.validate()?;

        let table_store = self.store(store);
        if table_store.has(row_id.as_bytes())? {
            return Err(OrmError::UniqueConstraint(format!(
                "row {:?} already exists in table 0x{:02x}",
                row_id, self.prefix
            )));
        }

        let bytes = value.marshal()?;
        table_store.set(row_id.as_bytes(), &bytes)?;

        for interceptor in self.after_save.iter() {
            interceptor(store, row_id, value, None)?;
        }

        tracing::trace!("Created row {:?} in table 0x{:02x}", row_id, self.prefix);
        Ok(())
    }

    /// Overwrite an existing row. Fails with `NotFound` if it does not exist.
    pub fn save(&self, store: &dyn KVStore, row_id: &RowId, value: &T) -> Result<()> {
        let old = self.get_one(store, row_id)?;

        let bytes = value.marshal()?;
        self.store(store).set(row_id.as_bytes(), &bytes)?;

        for interceptor in self.after_save.iter() {
            interceptor(store, row_id, value, Some(&old))?;
        }

        tracing::trace!("Saved row {:?} in table 0x{:02x}", row_id, self.prefix);
        Ok(())
    }

    /// Remove an existing row. Fails with `NotFound` if it does not exist.
    pub fn delete(&self, store: &dyn KVStore, row_id: &RowId) -> Result<()> {
        let old = self.get_one(store, row_id)?;

        self.store(store).delete(row_id.as_bytes())?;

        for interceptor in self.after_delete.iter() {
            interceptor(store, row_id, &old)?;
        }

        tracing::trace!("Deleted row {:?} from table 0x{:02x}", row_id, self.prefix);
        Ok(())
    }

    pub fn has(&self, store: &dyn KVStore, row_id: &RowId) -> Result<bool> {
        self.store(store).has(row_id.as_bytes())
    }

    pub fn get_one(&self, store: &dyn KVStore, row_id: &RowId) -> Result<T> {
        self.row_getter().get(store, row_id)
    }

    /// Rows with ids in `[start, end)`, ascending. `None` bounds are open.
    pub fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<TableIterator<'a, T>> {
        check_range(start, end)?;
        let inner = self.store(store).scan(start, end, false)?;
        Ok(TableIterator::new(inner))
    }

    /// Rows with ids in `[start, end)`, descending
    pub fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<TableIterator<'a, T>> {
        check_range(start, end)?;
        let inner = self.store(store).scan(start, end, true)?;
        Ok(TableIterator::new(inner))
    }

    /// One page of rows starting at `page.key` (or the first row)
    pub fn paginate(
        &self,
        store: &dyn KVStore,
        page: &PageRequest,
        config: &Config,
    ) -> Result<Page<T>> {
        let start = page.key.as_ref().map(RowId::as_bytes);
        let it = self.prefix_scan(store, start, None)?;
        paginate(it, page.effective_limit(config))
    }

    /// Every row in key order
    pub fn export(&self, store: &dyn KVStore) -> Result<Vec<ExportedRow<T>>> {
        self.prefix_scan(store, None, None)?
            .map(|item| item.map(|(id, value)| ExportedRow { id, value }))
            .collect()
    }

    /// Replace the table contents with `rows`.
    ///
    /// Existing rows are removed and the new ones created through the normal
    /// delete/create paths, so attached indexes are pruned and rebuilt.
    pub fn import(&self, store: &dyn KVStore, rows: &[ExportedRow<T>]) -> Result<()> {
        let existing = self
            .prefix_scan(store, None, None)?
            .map(|item| item.map(|(id, _)| id))
            .collect::<Result<Vec<_>>>()?;

        for row_id in &existing {
            self.delete(store, row_id)?;
        }
        for row in rows {
            self.create(store, &row.id, &row.value)?;
        }

        tracing::debug!(
            "Imported {} rows into table 0x{:02x} ({} removed)",
            rows.len(),
            self.prefix,
            existing.len()
        );
        Ok(())
    }

    fn store<'a>(&self, store: &'a dyn KVStore) -> PrefixStore<'a> {
        PrefixStore::new(store, [self.prefix])
    }
}
