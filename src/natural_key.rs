//! Natural-key tables
//!
//! Rows are stored under a key computed from their own content. The key is
//! immutable: a row can be updated in place but never moved to another key.
//!
//! ```text
//! create(v)          → key = v.natural_key(); must be free
//! save(v)            → key = v.natural_key(); must already exist
//! save_at(key, v)    → v.natural_key() must equal key
//! delete(v)          → key = v.natural_key()
//! ```

use crate::codec::Persistent;
use crate::error::{OrmError, Result};
use crate::iterator::TableIterator;
use crate::key::RowId;
use crate::schema::Schema;
use crate::store::KVStore;
use crate::table::{
    AfterDeleteInterceptor, AfterSaveInterceptor, ExportedRow, Indexable, RowGetter, Table,
    TableBuilder,
};

/// A row type that derives its own primary key
///
/// The key must be a pure function of fields that never change over the
/// row's lifetime. Leading with an encoded parent id (see
/// [`crate::key::encode_u64`]) keeps child rows contiguous under their parent.
pub trait NaturalKeyed {
    fn natural_key(&self) -> RowId;
}

/// Builder for [`NaturalKeyTable`]
pub struct NaturalKeyTableBuilder<'s, T> {
    builder: TableBuilder<'s, T>,
}

impl<'s, T: Persistent + NaturalKeyed> NaturalKeyTableBuilder<'s, T> {
    pub fn new(schema: &'s Schema, prefix: u8) -> Result<Self> {
        Ok(Self {
            builder: TableBuilder::new(schema, prefix)?,
        })
    }

    pub fn build(self) -> NaturalKeyTable<T> {
        NaturalKeyTable {
            table: self.builder.build(),
        }
    }
}

impl<T: Persistent + NaturalKeyed> Indexable<T> for NaturalKeyTableBuilder<'_, T> {
    fn schema(&self) -> &Schema {
        self.builder.schema()
    }

    fn row_getter(&self) -> RowGetter<T> {
        self.builder.row_getter()
    }

    fn add_after_save_interceptor(&mut self, interceptor: AfterSaveInterceptor<T>) {
        self.builder.add_after_save_interceptor(interceptor);
    }

    fn add_after_delete_interceptor(&mut self, interceptor: AfterDeleteInterceptor<T>) {
        self.builder.add_after_delete_interceptor(interceptor);
    }
}

/// Table whose rows are keyed by [`NaturalKeyed::natural_key`]
pub struct NaturalKeyTable<T> {
    table: Table<T>,
}

impl<T> Clone for NaturalKeyTable<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<T: Persistent + NaturalKeyed> NaturalKeyTable<T> {
    /// Store a new row under its natural key; `UniqueConstraint` if taken
    pub fn create(&self, store: &dyn KVStore, value: &T) -> Result<RowId> {
        let row_id = value.natural_key();
        self.table.create(store, &row_id, value)?;
        Ok(row_id)
    }

    /// Update the row stored under `value`'s natural key.
    ///
    /// A value whose natural key was changed resolves to a key with no row
    /// and fails with `NotFound`; the row under the old key is untouched.
    pub fn save(&self, store: &dyn KVStore, value: &T) -> Result<()> {
        self.table.save(store, &value.natural_key(), value)
    }

    /// Update the row stored under `row_id`, rejecting a value whose natural
    /// key no longer matches it
    pub fn save_at(&self, store: &dyn KVStore, row_id: &RowId, value: &T) -> Result<()> {
        let natural_key = value.natural_key();
        if &natural_key != row_id {
            tracing::debug!(
                "Rejected natural key change {:?} -> {:?} in table 0x{:02x}",
                row_id,
                natural_key,
                self.table.prefix()
            );
            return Err(OrmError::InvalidArgument(format!(
                "natural key is immutable: row {:?} cannot become {:?}",
                row_id, natural_key
            )));
        }
        self.table.save(store, row_id, value)
    }

    pub fn delete(&self, store: &dyn KVStore, value: &T) -> Result<()> {
        self.table.delete(store, &value.natural_key())
    }

    pub fn has(&self, store: &dyn KVStore, row_id: &RowId) -> Result<bool> {
        self.table.has(store, row_id)
    }

    pub fn get_one(&self, store: &dyn KVStore, row_id: &RowId) -> Result<T> {
        self.table.get_one(store, row_id)
    }

    pub fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<TableIterator<'a, T>> {
        self.table.prefix_scan(store, start, end)
    }

    pub fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<TableIterator<'a, T>> {
        self.table.reverse_prefix_scan(store, start, end)
    }

    pub fn table(&self) -> &Table<T> {
        &self.table
    }

    pub fn export(&self, store: &dyn KVStore) -> Result<Vec<ExportedRow<T>>> {
        self.table.export(store)
    }

    /// Replace the table contents; every row must sit under its natural key
    pub fn import(&self, store: &dyn KVStore, rows: &[ExportedRow<T>]) -> Result<()> {
        if let Some(row) = rows.iter().find(|row| row.value.natural_key() != row.id) {
            return Err(OrmError::InvalidArgument(format!(
                "row {:?} is not stored under its natural key {:?}",
                row.id,
                row.value.natural_key()
            )));
        }
        self.table.import(store, rows)
    }

    /// [`NaturalKeyTable::import`] from JSON
    pub fn import_json(&self, store: &dyn KVStore, json: &[u8]) -> Result<()> {
        let rows: Vec<ExportedRow<T>> = serde_json::from_slice(json)
            .map_err(|e| OrmError::TypeMismatch(e.to_string()))?;
        self.import(store, &rows)
    }
}
