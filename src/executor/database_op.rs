use std::fs;

use anyhow::{anyhow, bail, Result};

use crate::binder::DatabaseOpKind;
use crate::error::EngineError;
use crate::planner::DatabaseOpPlan;

use super::{Executor, ExecutorContext, Output};

/// Filesystem-level database operations: each database is one
/// `<data_dir>/<name>.db` file.
pub struct DatabaseOpExecutor<'a> {
    ctx: &'a ExecutorContext<'a>,
    plan: &'a DatabaseOpPlan,
    executed: bool,
}

impl<'a> DatabaseOpExecutor<'a> {
    pub fn new(ctx: &'a ExecutorContext<'a>, plan: &'a DatabaseOpPlan) -> Self {
        DatabaseOpExecutor {
            ctx,
            plan,
            executed: false,
        }
    }

    fn name(&self) -> Result<&str> {
        self.plan.name.as_deref().ok_or_else(|| {
            anyhow!(EngineError::Internal(
                "database operation is missing its name".to_string()
            ))
        })
    }
}

impl Executor for DatabaseOpExecutor<'_> {
    fn open(&mut self) -> Result<()> {
        self.executed = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Output>> {
        if self.executed {
            return Ok(None);
        }
        self.executed = true;

        let message = match self.plan.kind {
            DatabaseOpKind::Create => {
                let name = self.name()?;
                fs::create_dir_all(self.ctx.data_dir).map_err(|e| {
                    EngineError::Io(format!(
                        "failed to create database directory {}: {e}",
                        self.ctx.data_dir.display()
                    ))
                })?;
                let path = self.ctx.data_dir.join(format!("{name}.db"));
                // Touch, never truncate: CREATE over an existing file must
                // not wipe its pages.
                fs::OpenOptions::new()
                    .create(true)
                    .truncate(false)
                    .write(true)
                    .open(&path)
                    .map_err(|e| {
                        EngineError::Io(format!(
                            "failed to create database file {}: {e}",
                            path.display()
                        ))
                    })?;
                Output::Message {
                    success: true,
                    text: "Ok".to_string(),
                    rows_affected: 0,
                }
            }

            DatabaseOpKind::Drop => {
                let name = self.name()?;
                let path = self.ctx.data_dir.join(format!("{name}.db"));
                if path.exists() {
                    fs::remove_file(&path).map_err(|e| {
                        EngineError::Io(format!(
                            "failed to remove database file {}: {e}",
                            path.display()
                        ))
                    })?;
                    Output::Message {
                        success: true,
                        text: "Ok".to_string(),
                        rows_affected: 0,
                    }
                } else {
                    Output::Message {
                        success: false,
                        text: format!("Database does not exist: {name}"),
                        rows_affected: 0,
                    }
                }
            }

            // The engine swaps the storage stack before planning ever
            // sees a USE; this arm answers for completeness.
            DatabaseOpKind::Use => Output::Message {
                success: true,
                text: "Ok".to_string(),
                rows_affected: 0,
            },

            DatabaseOpKind::Show => {
                let mut names = Vec::new();
                match fs::read_dir(self.ctx.data_dir) {
                    Ok(entries) => {
                        for entry in entries {
                            let entry = entry.map_err(|e| {
                                EngineError::Io(format!("failed to list databases: {e}"))
                            })?;
                            let path = entry.path();
                            if path.extension().and_then(|e| e.to_str()) == Some("db") {
                                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                                    names.push(stem.to_string());
                                }
                            }
                        }
                    }
                    // No directory yet means no databases yet.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => bail!(EngineError::Io(format!("failed to list databases: {e}"))),
                }
                names.sort();
                Output::Message {
                    success: true,
                    text: names.join("\n"),
                    rows_affected: 0,
                }
            }
        };

        Ok(Some(message))
    }

    fn close(&mut self) {}
}
