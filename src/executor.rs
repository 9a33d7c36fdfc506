mod create_table;
mod database_op;
mod drop_table;
mod insert;
mod projection;
mod seq_scan;
mod show_tables;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::buffer_pool::BufferPoolManager;
use crate::catalog::Catalog;
use crate::planner::Plan;
use crate::tuple::{Schema, Value};

pub use create_table::CreateTableExecutor;
pub use database_op::DatabaseOpExecutor;
pub use drop_table::DropTableExecutor;
pub use insert::InsertExecutor;
pub use projection::ProjectionExecutor;
pub use seq_scan::SeqScanExecutor;
pub use show_tables::ShowTablesExecutor;

/// Shared references an operator may need while it runs. Database-level
/// operations execute without an open catalog.
pub struct ExecutorContext<'a> {
    pub bpm: Option<Arc<Mutex<BufferPoolManager>>>,
    pub catalog: Option<&'a Catalog>,
    pub data_dir: &'a Path,
}

/// What an operator hands upward on each `next` call: either one row with
/// the schema describing it, or a terminal status message.
#[derive(Debug, Clone)]
pub enum Output {
    Row {
        values: Vec<Value>,
        schema: Arc<Schema>,
    },
    Message {
        success: bool,
        text: String,
        rows_affected: usize,
    },
}

// Volcano model: open/next/close lifecycle, pull-based.
pub trait Executor {
    fn open(&mut self) -> Result<()>;
    fn next(&mut self) -> Result<Option<Output>>;
    fn close(&mut self);
}

#[derive(Debug, Clone)]
pub struct TupleSet {
    pub schema: Arc<Schema>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct ResultSet {
    pub success: bool,
    pub message: String,
    pub data: Option<TupleSet>,
}

impl ResultSet {
    pub fn success(message: impl Into<String>) -> Self {
        ResultSet {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ResultSet {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn data(set: TupleSet) -> Self {
        ResultSet {
            success: true,
            message: format!("{} rows returned.", set.rows.len()),
            data: Some(set),
        }
    }
}

/// Builds the operator tree for a plan and drives it to completion.
/// Errors anywhere in the lifecycle become failed result sets; `close`
/// runs on the built tree regardless.
pub fn execute_plan(ctx: &ExecutorContext, plan: &Plan) -> ResultSet {
    let mut root = match build_executor(ctx, plan) {
        Ok(root) => root,
        Err(e) => return ResultSet::failure(e.to_string()),
    };

    let result = drive(root.as_mut());
    root.close();

    match result {
        Ok(result_set) => result_set,
        Err(e) => ResultSet::failure(e.to_string()),
    }
}

fn drive(root: &mut dyn Executor) -> Result<ResultSet> {
    root.open()?;

    let mut data: Option<TupleSet> = None;
    loop {
        match root.next()? {
            None => break,
            Some(Output::Row { values, schema }) => {
                data.get_or_insert_with(|| TupleSet {
                    schema,
                    rows: Vec::new(),
                })
                .rows
                .push(values);
            }
            Some(Output::Message {
                success,
                text,
                rows_affected,
            }) => {
                return Ok(ResultSet {
                    success,
                    message: format!("{text} ({rows_affected} rows affected)"),
                    data: None,
                });
            }
        }
    }

    Ok(match data {
        Some(set) => ResultSet::data(set),
        None => ResultSet::success("Ok"),
    })
}

fn build_executor<'a>(
    ctx: &'a ExecutorContext<'a>,
    plan: &'a Plan,
) -> Result<Box<dyn Executor + 'a>> {
    match plan {
        Plan::SeqScan(p) => Ok(Box::new(SeqScanExecutor::new(ctx, p))),
        Plan::Projection(p) => {
            let child = build_executor(ctx, &p.child)?;
            Ok(Box::new(ProjectionExecutor::new(p, child)?))
        }
        Plan::Insert(p) => Ok(Box::new(InsertExecutor::new(ctx, p))),
        Plan::CreateTable(p) => Ok(Box::new(CreateTableExecutor::new(ctx, p))),
        Plan::DropTable(p) => Ok(Box::new(DropTableExecutor::new(p))),
        Plan::ShowTables => Ok(Box::new(ShowTablesExecutor::new(ctx))),
        Plan::DatabaseOp(p) => Ok(Box::new(DatabaseOpExecutor::new(ctx, p))),
    }
}
