use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::ast::Statement;
use crate::binder::Binder;
use crate::buffer_pool::BufferPoolManager;
use crate::catalog::Catalog;
use crate::disk::DiskManager;
use crate::error::EngineError;
use crate::executor::{execute_plan, ExecutorContext, ResultSet};
use crate::parser;
use crate::planner;

struct Session {
    name: String,
    bpm: Arc<Mutex<BufferPoolManager>>,
    catalog: Catalog,
}

/// Owns the database directory and the storage stack of the currently
/// open database. `execute` is the single entry point: it parses first,
/// intercepts USE (stack swap) and EXIT (shutdown), and runs everything
/// else through bind, plan and execute against the open stack.
pub struct DatabaseManager {
    data_dir: PathBuf,
    session: Option<Session>,
    running: bool,
}

impl DatabaseManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        DatabaseManager {
            data_dir: data_dir.into(),
            session: None,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_database(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.name.as_str())
    }

    pub fn execute(&mut self, query: &str) -> ResultSet {
        let stmt = match parser::parse(query) {
            Ok(stmt) => stmt,
            Err(e) => return ResultSet::failure(e.to_string()),
        };

        match stmt {
            Statement::UseDatabase(name) => match self.open_database(&name) {
                Ok(()) => ResultSet::success(format!("Database initialized: {name}")),
                Err(e) => ResultSet::failure(e.to_string()),
            },
            Statement::Exit => {
                self.shutdown();
                ResultSet::success("")
            }
            stmt => self.run(&stmt),
        }
    }

    fn run(&mut self, stmt: &Statement) -> ResultSet {
        let binder = Binder::new(self.session.as_ref().map(|s| &s.catalog));
        let bound = match binder.bind(stmt) {
            Ok(bound) => bound,
            Err(e) => return ResultSet::failure(e.to_string()),
        };
        let plan = planner::plan(bound);

        let ctx = ExecutorContext {
            bpm: self.session.as_ref().map(|s| Arc::clone(&s.bpm)),
            catalog: self.session.as_ref().map(|s| &s.catalog),
            data_dir: &self.data_dir,
        };
        execute_plan(&ctx, &plan)
    }

    /// Tears down the current stack (flushing every dirty page) and builds
    /// a fresh one rooted at `<data_dir>/<name>.db`, creating the file on
    /// first use.
    fn open_database(&mut self, name: &str) -> Result<()> {
        self.close_session()?;

        fs::create_dir_all(&self.data_dir).map_err(|e| {
            EngineError::Io(format!(
                "failed to create database directory {}: {e}",
                self.data_dir.display()
            ))
        })?;

        let path = self.data_dir.join(format!("{name}.db"));
        let disk = DiskManager::open(&path)?;
        let bpm = Arc::new(Mutex::new(BufferPoolManager::new(disk)));
        let catalog = Catalog::open(Arc::clone(&bpm))?;

        println!("[Engine] using database '{name}'");
        self.session = Some(Session {
            name: name.to_string(),
            bpm,
            catalog,
        });
        Ok(())
    }

    fn close_session(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session.bpm.lock().unwrap().flush_all()?;
            println!("[Engine] closed database '{}'", session.name);
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Err(e) = self.close_session() {
            eprintln!("[Engine] error while closing database: {e}");
        }
        self.running = false;
    }

    /// Flush and drop the open stack without ending the session loop.
    pub fn close(&mut self) {
        if let Err(e) = self.close_session() {
            eprintln!("[Engine] error while closing database: {e}");
        }
    }
}
