use std::sync::Arc;

use anyhow::{bail, Result};

use crate::error::EngineError;
use crate::planner::ProjectionPlan;
use crate::tuple::Schema;

use super::{Executor, Output};

/// Narrows each child row to the requested columns, extracted by name
/// from the child's schema. Messages pass through unchanged.
pub struct ProjectionExecutor<'a> {
    plan: &'a ProjectionPlan,
    child: Box<dyn Executor + 'a>,
    output_schema: Arc<Schema>,
}

impl<'a> ProjectionExecutor<'a> {
    pub fn new(plan: &'a ProjectionPlan, child: Box<dyn Executor + 'a>) -> Result<Self> {
        let mut output_schema = Schema::new();
        for column in &plan.columns {
            output_schema.add_column(&column.name, column.data_type, column.is_primary)?;
        }
        Ok(ProjectionExecutor {
            plan,
            child,
            output_schema: Arc::new(output_schema),
        })
    }
}

impl Executor for ProjectionExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Output>> {
        let child_out = match self.child.next()? {
            Some(out) => out,
            None => return Ok(None),
        };

        let (values, schema) = match child_out {
            Output::Message { .. } => return Ok(Some(child_out)),
            Output::Row { values, schema } => (values, schema),
        };

        let mut projected = Vec::with_capacity(self.plan.columns.len());
        for column in &self.plan.columns {
            // The binder resolved these names; a miss here is a bug.
            let index = match schema.column_index(&column.name) {
                Some(index) => index,
                None => bail!(EngineError::Internal(format!(
                    "projection column '{}' missing from child schema",
                    column.name
                ))),
            };
            projected.push(values[index].clone());
        }

        Ok(Some(Output::Row {
            values: projected,
            schema: Arc::clone(&self.output_schema),
        }))
    }

    fn close(&mut self) {
        self.child.close();
    }
}
