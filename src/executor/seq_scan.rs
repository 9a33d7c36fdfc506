use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::error::EngineError;
use crate::heap::{TableHeap, TableIter};
use crate::planner::SeqScanPlan;
use crate::tuple::Schema;

use super::{Executor, ExecutorContext, Output};

/// Full scan over one table's page chain, in slot then chain order.
pub struct SeqScanExecutor<'a> {
    ctx: &'a ExecutorContext<'a>,
    plan: &'a SeqScanPlan,
    schema: Arc<Schema>,
    iter: Option<TableIter>,
}

impl<'a> SeqScanExecutor<'a> {
    pub fn new(ctx: &'a ExecutorContext<'a>, plan: &'a SeqScanPlan) -> Self {
        SeqScanExecutor {
            ctx,
            plan,
            schema: Arc::new(plan.table.schema.clone()),
            iter: None,
        }
    }
}

impl Executor for SeqScanExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        let bpm = self
            .ctx
            .bpm
            .as_ref()
            .ok_or_else(|| anyhow!(EngineError::NoDatabase))?;
        let heap = TableHeap::new(
            Arc::clone(bpm),
            self.plan.table.schema.clone(),
            self.plan.table.first_page_id,
        );
        self.iter = Some(heap.iter());
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Output>> {
        let iter = match self.iter.as_mut() {
            Some(iter) => iter,
            None => return Ok(None),
        };
        match iter.next() {
            None => Ok(None),
            Some(Err(e)) => Err(e),
            Some(Ok((_rid, tuple))) => {
                let values = tuple.values(&self.schema)?;
                Ok(Some(Output::Row {
                    values,
                    schema: Arc::clone(&self.schema),
                }))
            }
        }
    }

    fn close(&mut self) {
        self.iter = None;
    }
}
