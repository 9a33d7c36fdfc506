use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::catalog::MASTER_TABLES_NAME;
use crate::error::EngineError;
use crate::heap::{TableHeap, TableIter};
use crate::tuple::{DataType, Schema};

use super::{Executor, ExecutorContext, Output};

/// An internal scan over `master_tables` that keeps only the `table_name`
/// column, yielding one single-column row per catalogued table.
pub struct ShowTablesExecutor<'a> {
    ctx: &'a ExecutorContext<'a>,
    scan: Option<(TableIter, Schema, usize)>,
    output_schema: Arc<Schema>,
}

impl<'a> ShowTablesExecutor<'a> {
    pub fn new(ctx: &'a ExecutorContext<'a>) -> Self {
        let mut output_schema = Schema::new();
        output_schema
            .add_column("table_name", DataType::Char, false)
            .expect("fresh schema accepts its first column");
        ShowTablesExecutor {
            ctx,
            scan: None,
            output_schema: Arc::new(output_schema),
        }
    }
}

impl Executor for ShowTablesExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        let catalog = self
            .ctx
            .catalog
            .ok_or_else(|| anyhow!(EngineError::NoDatabase))?;
        let bpm = self
            .ctx
            .bpm
            .as_ref()
            .ok_or_else(|| anyhow!(EngineError::NoDatabase))?;

        let table = catalog.get_table_ref(MASTER_TABLES_NAME)?.ok_or_else(|| {
            anyhow!(EngineError::Internal(
                "master_tables missing from catalog".to_string()
            ))
        })?;
        let name_index = table.schema.column_index("table_name").ok_or_else(|| {
            anyhow!(EngineError::Internal(
                "master_tables has no table_name column".to_string()
            ))
        })?;

        let schema = table.schema.clone();
        let heap = TableHeap::new(Arc::clone(bpm), table.schema, table.first_page_id);
        self.scan = Some((heap.iter(), schema, name_index));
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Output>> {
        let (iter, schema, name_index) = match self.scan.as_mut() {
            Some(scan) => scan,
            None => return Ok(None),
        };
        match iter.next() {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok((_rid, tuple))) => {
                let name = tuple.value_at(*name_index, schema)?;
                Ok(Some(Output::Row {
                    values: vec![name],
                    schema: Arc::clone(&self.output_schema),
                }))
            }
        }
    }

    fn close(&mut self) {
        self.scan = None;
    }
}
