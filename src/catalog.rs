use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::buffer_pool::BufferPoolManager;
use crate::error::EngineError;
use crate::heap::TableHeap;
use crate::tuple::{DataType, Schema, Value};

// System table ids and their fixed page ids.
pub const MASTER_TABLES_TABLE_ID: u32 = 0;
pub const MASTER_COLUMNS_TABLE_ID: u32 = 1;

pub const MASTER_TABLES_PAGE_ID: u32 = 0;
pub const MASTER_COLUMNS_PAGE_ID: u32 = 1;
/// Reserved for a future index catalog; stays zeroed.
pub const MASTER_INDEXES_PAGE_ID: u32 = 2;

pub const MASTER_TABLES_NAME: &str = "master_tables";
pub const MASTER_COLUMNS_NAME: &str = "master_columns";

/// Columns of the two system tables at cold bootstrap:
/// (column_id, table_id, column_name, column_type, column_size, ordinal, is_primary_key)
const SYSTEM_COLUMNS: [(i32, i32, &str, i32, i32, i32, i32); 12] = [
    (0, 0, "table_id", 1, 4, 0, 1),
    (1, 0, "table_name", 3, 32, 1, 0),
    (2, 0, "num_columns", 1, 4, 2, 0),
    (3, 0, "first_page_id", 1, 4, 3, 0),
    (4, 0, "primary_key", 1, 4, 4, 0),
    (5, 1, "column_id", 1, 4, 0, 1),
    (6, 1, "table_id", 1, 4, 1, 0),
    (7, 1, "column_name", 3, 32, 2, 0),
    (8, 1, "column_type", 1, 4, 3, 0),
    (9, 1, "column_size", 1, 4, 4, 0),
    (10, 1, "ordinal_position", 1, 4, 5, 0),
    (11, 1, "is_primary_key", 1, 4, 6, 0),
];

/// A resolved table: everything the binder and executor need to touch it.
/// Each lookup builds a fresh `TableRef` with its own `Schema`.
#[derive(Debug, Clone)]
pub struct TableRef {
    pub table_id: u32,
    pub name: String,
    pub first_page_id: u32,
    pub schema: Schema,
}

/// Table and column metadata, itself stored as two heap tables at fixed
/// page ids. The catalog is stateless beyond the buffer pool handle: next
/// ids are recomputed by scanning, so a warm reopen picks up where the
/// previous session stopped.
pub struct Catalog {
    bpm: Arc<Mutex<BufferPoolManager>>,
}

impl Catalog {
    /// Opens the catalog, cold-bootstrapping the system tables when the
    /// file holds no pages yet. Probing `fetch_page(0)` would be ambiguous
    /// on short files; the file extent is the explicit signal.
    pub fn open(bpm: Arc<Mutex<BufferPoolManager>>) -> Result<Catalog> {
        let catalog = Catalog { bpm };
        let cold = catalog.bpm.lock().unwrap().page_count() == 0;
        if cold {
            catalog.bootstrap()?;
        }
        Ok(catalog)
    }

    // Hardcoded to break the circularity: the schema of the table that
    // stores schemas cannot come from the catalog itself.
    fn master_tables_schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_column("table_id", DataType::Int, true).unwrap();
        schema.add_column("table_name", DataType::Char, false).unwrap();
        schema.add_column("num_columns", DataType::Int, false).unwrap();
        schema.add_column("first_page_id", DataType::Int, false).unwrap();
        schema.add_column("primary_key", DataType::Int, false).unwrap();
        schema
    }

    fn master_columns_schema() -> Schema {
        let mut schema = Schema::new();
        schema.add_column("column_id", DataType::Int, true).unwrap();
        schema.add_column("table_id", DataType::Int, false).unwrap();
        schema.add_column("column_name", DataType::Char, false).unwrap();
        schema.add_column("column_type", DataType::Int, false).unwrap();
        schema.add_column("column_size", DataType::Int, false).unwrap();
        schema.add_column("ordinal_position", DataType::Int, false).unwrap();
        schema.add_column("is_primary_key", DataType::Int, false).unwrap();
        schema
    }

    fn master_tables_heap(&self) -> TableHeap {
        TableHeap::new(
            Arc::clone(&self.bpm),
            Self::master_tables_schema(),
            MASTER_TABLES_PAGE_ID,
        )
    }

    fn master_columns_heap(&self) -> TableHeap {
        TableHeap::new(
            Arc::clone(&self.bpm),
            Self::master_columns_schema(),
            MASTER_COLUMNS_PAGE_ID,
        )
    }

    fn bootstrap(&self) -> Result<()> {
        println!("[Catalog] cold bootstrap: creating system tables");

        self.bpm.lock().unwrap().new_page_at(MASTER_TABLES_PAGE_ID)?;
        let tables = self.master_tables_heap();
        tables.insert(&[
            Value::Int(MASTER_TABLES_TABLE_ID as i32),
            Value::Char(MASTER_TABLES_NAME.to_string()),
            Value::Int(5),
            Value::Int(MASTER_TABLES_PAGE_ID as i32),
            Value::Int(0),
        ])?;
        tables.insert(&[
            Value::Int(MASTER_COLUMNS_TABLE_ID as i32),
            Value::Char(MASTER_COLUMNS_NAME.to_string()),
            Value::Int(7),
            Value::Int(MASTER_COLUMNS_PAGE_ID as i32),
            Value::Int(0),
        ])?;

        self.bpm.lock().unwrap().new_page_at(MASTER_COLUMNS_PAGE_ID)?;
        let columns = self.master_columns_heap();
        for (column_id, table_id, name, column_type, size, ordinal, pk) in SYSTEM_COLUMNS {
            columns.insert(&[
                Value::Int(column_id),
                Value::Int(table_id),
                Value::Char(name.to_string()),
                Value::Int(column_type),
                Value::Int(size),
                Value::Int(ordinal),
                Value::Int(pk),
            ])?;
        }

        let mut bpm = self.bpm.lock().unwrap();
        bpm.flush_page(MASTER_TABLES_PAGE_ID)?;
        bpm.flush_page(MASTER_COLUMNS_PAGE_ID)?;
        Ok(())
    }

    fn scan(&self, heap: &TableHeap) -> Result<Vec<Vec<Value>>> {
        heap.iter()
            .map(|entry| entry.and_then(|(_, tuple)| tuple.values(heap.schema())))
            .collect()
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let rows = self.scan(&self.master_tables_heap())?;
        Ok(rows.iter().any(|row| row[1].as_str() == Some(name)))
    }

    pub fn get_table_ref(&self, name: &str) -> Result<Option<TableRef>> {
        let rows = self.scan(&self.master_tables_heap())?;
        let row = match rows.iter().find(|row| row[1].as_str() == Some(name)) {
            Some(row) => row,
            None => return Ok(None),
        };

        let table_id = row[0].as_int().unwrap_or(0) as u32;
        let first_page_id = row[3].as_int().unwrap_or(0) as u32;

        // Rebuild the schema from master_columns, in ordinal order.
        let column_rows = self.scan(&self.master_columns_heap())?;
        let mut columns: Vec<(i32, String, DataType, bool)> = Vec::new();
        for row in &column_rows {
            if row[1].as_int() != Some(table_id as i32) {
                continue;
            }
            let name = row[2].as_str().unwrap_or_default().to_string();
            let data_type = DataType::from_code(row[3].as_int().unwrap_or(0))?;
            let ordinal = row[5].as_int().unwrap_or(0);
            let is_primary = row[6].as_int() == Some(1);
            columns.push((ordinal, name, data_type, is_primary));
        }
        columns.sort_by_key(|(ordinal, ..)| *ordinal);

        let mut schema = Schema::new();
        for (_, column_name, data_type, is_primary) in columns {
            schema.add_column(&column_name, data_type, is_primary)?;
        }

        Ok(Some(TableRef {
            table_id,
            name: name.to_string(),
            first_page_id,
            schema,
        }))
    }

    pub fn next_table_id(&self) -> Result<u32> {
        let rows = self.scan(&self.master_tables_heap())?;
        let max = rows
            .iter()
            .filter_map(|row| row[0].as_int())
            .max()
            .unwrap_or(MASTER_COLUMNS_TABLE_ID as i32);
        Ok(max as u32 + 1)
    }

    pub fn next_column_id(&self) -> Result<u32> {
        let rows = self.scan(&self.master_columns_heap())?;
        let max = rows
            .iter()
            .filter_map(|row| row[0].as_int())
            .max()
            .unwrap_or(SYSTEM_COLUMNS.len() as i32 - 1);
        Ok(max as u32 + 1)
    }

    /// Registers a table: a fresh heap head page plus one `master_tables`
    /// row and one `master_columns` row per column. The touched pages are
    /// flushed before returning.
    pub fn create_table(&self, name: &str, schema: &Schema) -> Result<TableRef> {
        if self.table_exists(name)? {
            bail!(EngineError::AlreadyExists(format!(
                "table '{name}' already exists"
            )));
        }

        let (first_page_id, _page) = self.bpm.lock().unwrap().new_page()?;
        let table_id = self.next_table_id()?;
        let primary_key_column = schema
            .columns
            .iter()
            .position(|c| c.is_primary)
            .unwrap_or(0) as i32;

        self.master_tables_heap().insert(&[
            Value::Int(table_id as i32),
            Value::Char(name.to_string()),
            Value::Int(schema.column_count() as i32),
            Value::Int(first_page_id as i32),
            Value::Int(primary_key_column),
        ])?;

        let columns = self.master_columns_heap();
        let mut column_id = self.next_column_id()?;
        for column in &schema.columns {
            columns.insert(&[
                Value::Int(column_id as i32),
                Value::Int(table_id as i32),
                Value::Char(column.name.clone()),
                Value::Int(column.data_type.to_code()),
                Value::Int(column.data_type.byte_width() as i32),
                Value::Int(column.ordinal as i32),
                Value::Int(column.is_primary as i32),
            ])?;
            column_id += 1;
        }

        let mut bpm = self.bpm.lock().unwrap();
        bpm.flush_page(MASTER_TABLES_PAGE_ID)?;
        bpm.flush_page(MASTER_COLUMNS_PAGE_ID)?;
        bpm.flush_page(first_page_id)?;
        drop(bpm);

        Ok(TableRef {
            table_id,
            name: name.to_string(),
            first_page_id,
            schema: schema.clone(),
        })
    }

    pub fn drop_table(&self, name: &str) -> Result<()> {
        bail!(EngineError::NotImplemented(format!("DROP TABLE {name}")))
    }
}
