use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::error::EngineError;
use crate::heap::TableHeap;
use crate::planner::InsertPlan;

use super::{Executor, ExecutorContext, Output};

/// One-shot: serializes the bound rows into the target heap and reports a
/// single status message.
pub struct InsertExecutor<'a> {
    ctx: &'a ExecutorContext<'a>,
    plan: &'a InsertPlan,
    heap: Option<TableHeap>,
    executed: bool,
}

impl<'a> InsertExecutor<'a> {
    pub fn new(ctx: &'a ExecutorContext<'a>, plan: &'a InsertPlan) -> Self {
        InsertExecutor {
            ctx,
            plan,
            heap: None,
            executed: false,
        }
    }
}

impl Executor for InsertExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        let bpm = self
            .ctx
            .bpm
            .as_ref()
            .ok_or_else(|| anyhow!(EngineError::NoDatabase))?;
        self.heap = Some(TableHeap::new(
            Arc::clone(bpm),
            self.plan.table.schema.clone(),
            self.plan.table.first_page_id,
        ));
        self.executed = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Output>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        let heap = match self.heap.as_ref() {
            Some(heap) => heap,
            None => {
                return Err(anyhow!(EngineError::Internal(
                    "insert executor was not opened".to_string()
                )))
            }
        };

        let mut inserted = 0usize;
        for row in &self.plan.rows {
            heap.insert(row)?;
            inserted += 1;
        }

        let noun = if inserted == 1 { "row" } else { "rows" };
        Ok(Some(Output::Message {
            success: true,
            text: format!("Inserted {inserted} {noun} into {}", self.plan.table.name),
            rows_affected: inserted,
        }))
    }

    fn close(&mut self) {
        self.heap = None;
    }
}
