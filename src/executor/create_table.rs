use anyhow::{anyhow, Result};

use crate::error::EngineError;
use crate::planner::CreateTablePlan;

use super::{Executor, ExecutorContext, Output};

/// One-shot wrapper over `Catalog::create_table`.
pub struct CreateTableExecutor<'a> {
    ctx: &'a ExecutorContext<'a>,
    plan: &'a CreateTablePlan,
    executed: bool,
}

impl<'a> CreateTableExecutor<'a> {
    pub fn new(ctx: &'a ExecutorContext<'a>, plan: &'a CreateTablePlan) -> Self {
        CreateTableExecutor {
            ctx,
            plan,
            executed: false,
        }
    }
}

impl Executor for CreateTableExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        self.executed = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Output>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        let catalog = self
            .ctx
            .catalog
            .ok_or_else(|| anyhow!(EngineError::NoDatabase))?;
        catalog.create_table(&self.plan.name, &self.plan.schema)?;

        Ok(Some(Output::Message {
            success: true,
            text: format!("Table {} created successfully.", self.plan.name),
            rows_affected: 0,
        }))
    }

    fn close(&mut self) {}
}
