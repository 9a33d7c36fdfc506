use anyhow::{bail, Result};

use crate::error::EngineError;
use crate::planner::DropTablePlan;

use super::{Executor, Output};

/// Accepted through the whole pipeline, unimplemented at the bottom:
/// the catalog has no way to drop a table yet.
pub struct DropTableExecutor<'a> {
    plan: &'a DropTablePlan,
}

impl<'a> DropTableExecutor<'a> {
    pub fn new(plan: &'a DropTablePlan) -> Self {
        DropTableExecutor { plan }
    }
}

impl Executor for DropTableExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Output>> {
        bail!(EngineError::NotImplemented(format!(
            "DROP TABLE {}",
            self.plan.name
        )))
    }

    fn close(&mut self) {}
}
