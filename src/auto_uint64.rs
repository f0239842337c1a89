//! Auto-increment tables
//!
//! A [`Table`] whose row ids are minted from a [`Sequence`] and encoded as
//! 8-byte big-endian integers, so numeric order equals key order.

use serde::{Deserialize, Serialize};

use crate::codec::Persistent;
use crate::error::{OrmError, Result};
use crate::iterator::TableIterator;
use crate::key::{encode_u64, RowId};
use crate::schema::Schema;
use crate::sequence::Sequence;
use crate::store::KVStore;
use crate::table::{
    AfterDeleteInterceptor, AfterSaveInterceptor, ExportedRow, Indexable, RowGetter, Table,
    TableBuilder,
};

/// Builder for [`AutoUInt64Table`]; indexes attach to it like to a [`TableBuilder`]
pub struct AutoUInt64TableBuilder<'s, T> {
    builder: TableBuilder<'s, T>,
    sequence: Sequence,
}

impl<'s, T: Persistent> AutoUInt64TableBuilder<'s, T> {
    /// Rows live under `table_prefix`, the id counter under `sequence_prefix`
    pub fn new(schema: &'s Schema, table_prefix: u8, sequence_prefix: u8) -> Result<Self> {
        let builder = TableBuilder::new(schema, table_prefix)?;
        let sequence = Sequence::new(schema, sequence_prefix)?;
        Ok(Self { builder, sequence })
    }

    pub fn build(self) -> AutoUInt64Table<T> {
        AutoUInt64Table {
            table: self.builder.build(),
            sequence: self.sequence,
        }
    }
}

impl<T: Persistent> Indexable<T> for AutoUInt64TableBuilder<'_, T> {
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

/// Exported contents of an auto-increment table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableExport<T> {
    /// Sequence value at export time
    pub sequence: u64,
    pub rows: Vec<ExportedRow<T>>,
}

/// Table keyed by sequence-minted `u64` ids
pub struct AutoUInt64Table<T> {
    table: Table<T>,
    sequence: Sequence,
}

impl<T> Clone for AutoUInt64Table<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            sequence: self.sequence,
        }
    }
}

impl<T: Persistent> AutoUInt64Table<T> {
    /// Mint the next id and store `value` under it
    pub fn create(&self, store: &dyn KVStore, value: &T) -> Result<u64> {
        let id = self.sequence.next_val(store)?;
        self.table.create(store, &RowId::from(id), value)?;
        Ok(id)
    }

    pub fn save(&self, store: &dyn KVStore, id: u64, value: &T) -> Result<()> {
        self.table.save(store, &RowId::from(id), value)
    }

    pub fn delete(&self, store: &dyn KVStore, id: u64) -> Result<()> {
        self.table.delete(store, &RowId::from(id))
    }

    pub fn has(&self, store: &dyn KVStore, id: u64) -> Result<bool> {
        self.table.has(store, &RowId::from(id))
    }

    pub fn get_one(&self, store: &dyn KVStore, id: u64) -> Result<T> {
        self.table.get_one(store, &RowId::from(id))
    }

    /// Rows with ids in `[start, end)`, ascending
    pub fn prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: u64,
        end: u64,
    ) -> Result<TableIterator<'a, T>> {
        check_ids(start, end)?;
        self.table
            .prefix_scan(store, Some(&encode_u64(start)[..]), Some(&encode_u64(end)[..]))
    }

    /// Rows with ids in `[start, end)`, descending
    pub fn reverse_prefix_scan<'a>(
        &self,
        store: &'a dyn KVStore,
        start: u64,
        end: u64,
    ) -> Result<TableIterator<'a, T>> {
        check_ids(start, end)?;
        self.table
            .reverse_prefix_scan(store, Some(&encode_u64(start)[..]), Some(&encode_u64(end)[..]))
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// The underlying byte-keyed table
    pub fn table(&self) -> &Table<T> {
        &self.table
    }

    /// Every row plus the current sequence value
    pub fn export(&self, store: &dyn KVStore) -> Result<TableExport<T>> {
        Ok(TableExport {
            sequence: self.sequence.cur_val(store)?,
            rows: self.table.export(store)?,
        })
    }

    /// Load exported data into a table whose sequence is still unset.
    ///
    /// Every row id must be a `u64` no greater than the exported sequence,
    /// otherwise later creates could collide with imported rows.
    pub fn import(&self, store: &dyn KVStore, data: &TableExport<T>) -> Result<()> {
        for row in &data.rows {
            let id = row.id.to_u64()?;
            if id == 0 || id > data.sequence {
                return Err(OrmError::InvalidArgument(format!(
                    "row id {} outside sequence range 1..={}",
                    id, data.sequence
                )));
            }
        }

        self.sequence.init_val(store, data.sequence)?;
        self.table.import(store, &data.rows)
    }

    /// [`AutoUInt64Table::import`] from JSON; data that does not decode into
    /// this table's row type is a `TypeMismatch`.
    pub fn import_json(&self, store: &dyn KVStore, json: &[u8]) -> Result<()> {
        let data: TableExport<T> = serde_json::from_slice(json)
            .map_err(|e| OrmError::TypeMismatch(e.to_string()))?;
        self.import(store, &data)
    }
}

fn check_ids(start: u64, end: u64) -> Result<()> {
    if start >= end {
        return Err(OrmError::InvalidArgument(
            "start must be less than end".to_string(),
        ));
    }
    Ok(())
}
