use anyhow::{bail, Result};

use crate::ast::{
    CreateTableStatement, InsertStatement, Literal, SelectColumn, SelectStatement, Statement,
    TypeName,
};
use crate::catalog::{Catalog, TableRef};
use crate::error::EngineError;
use crate::tuple::{Column, DataType, Schema, Value};

#[derive(Debug, Clone)]
pub enum BoundStatement {
    Select(BoundSelect),
    Insert(BoundInsert),
    CreateTable(BoundCreateTable),
    DropTable(BoundDropTable),
    ShowTables,
    DatabaseOp(BoundDatabaseOp),
}

#[derive(Debug, Clone)]
pub struct BoundSelect {
    pub table: TableRef,
    pub columns: Vec<BoundColumnRef>,
}

#[derive(Debug, Clone)]
pub struct BoundColumnRef {
    pub name: String,
    pub index: usize,
    pub data_type: DataType,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct BoundInsert {
    pub table: TableRef,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct BoundCreateTable {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct BoundDropTable {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseOpKind {
    Create,
    Drop,
    Use,
    Show,
}

#[derive(Debug, Clone)]
pub struct BoundDatabaseOp {
    pub kind: DatabaseOpKind,
    pub name: Option<String>,
}

/// Resolves names against the catalog and types literals. Database-level
/// operations bind without a catalog; everything touching tables needs an
/// open database.
pub struct Binder<'a> {
    catalog: Option<&'a Catalog>,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: Option<&'a Catalog>) -> Self {
        Binder { catalog }
    }

    fn catalog(&self) -> Result<&'a Catalog> {
        match self.catalog {
            Some(catalog) => Ok(catalog),
            None => bail!(EngineError::NoDatabase),
        }
    }

    pub fn bind(&self, stmt: &Statement) -> Result<BoundStatement> {
        match stmt {
            Statement::ShowDatabases => Ok(BoundStatement::DatabaseOp(BoundDatabaseOp {
                kind: DatabaseOpKind::Show,
                name: None,
            })),
            Statement::CreateDatabase(name) => Ok(BoundStatement::DatabaseOp(BoundDatabaseOp {
                kind: DatabaseOpKind::Create,
                name: Some(name.clone()),
            })),
            Statement::DropDatabase(name) => Ok(BoundStatement::DatabaseOp(BoundDatabaseOp {
                kind: DatabaseOpKind::Drop,
                name: Some(name.clone()),
            })),
            // The engine intercepts USE before binding; this arm exists so
            // the operator path stays complete.
            Statement::UseDatabase(name) => Ok(BoundStatement::DatabaseOp(BoundDatabaseOp {
                kind: DatabaseOpKind::Use,
                name: Some(name.clone()),
            })),
            Statement::ShowTables => {
                self.catalog()?;
                Ok(BoundStatement::ShowTables)
            }
            Statement::CreateTable(create) => self.bind_create_table(create),
            Statement::DropTable(name) => self.bind_drop_table(name),
            Statement::Select(select) => self.bind_select(select),
            Statement::Insert(insert) => self.bind_insert(insert),
            Statement::Exit => bail!(EngineError::Internal(
                "EXIT must be handled before binding".to_string()
            )),
        }
    }

    fn resolve_table(&self, name: &str) -> Result<TableRef> {
        match self.catalog()?.get_table_ref(name)? {
            Some(table) => Ok(table),
            None => bail!(EngineError::NotFound(format!(
                "table '{name}' does not exist"
            ))),
        }
    }

    fn bind_create_table(&self, stmt: &CreateTableStatement) -> Result<BoundStatement> {
        self.catalog()?;
        if stmt.columns.is_empty() {
            bail!(EngineError::Schema(
                "CREATE TABLE requires at least one column".to_string()
            ));
        }

        let mut schema = Schema::new();
        for column in &stmt.columns {
            let data_type = match column.type_name {
                TypeName::Int => DataType::Int,
                TypeName::Float => DataType::Float,
                TypeName::Char => DataType::Char,
            };
            schema.add_column(&column.name, data_type, column.primary_key)?;
        }

        Ok(BoundStatement::CreateTable(BoundCreateTable {
            name: stmt.table.clone(),
            schema,
        }))
    }

    fn bind_drop_table(&self, name: &str) -> Result<BoundStatement> {
        let table = self.resolve_table(name)?;
        Ok(BoundStatement::DropTable(BoundDropTable {
            name: table.name,
        }))
    }

    fn bind_select(&self, stmt: &SelectStatement) -> Result<BoundStatement> {
        let table = self.resolve_table(&stmt.table)?;

        let mut columns = Vec::new();
        for projection in &stmt.projections {
            match projection {
                SelectColumn::Asterisk => {
                    // Expand to every column in ordinal order.
                    for (index, column) in table.schema.columns.iter().enumerate() {
                        columns.push(Self::column_ref(index, column));
                    }
                }
                SelectColumn::Name(name) => {
                    let index = match table.schema.column_index(name) {
                        Some(index) => index,
                        None => bail!(EngineError::NotFound(format!(
                            "column '{name}' does not exist in table '{}'",
                            stmt.table
                        ))),
                    };
                    columns.push(Self::column_ref(index, &table.schema.columns[index]));
                }
            }
        }

        Ok(BoundStatement::Select(BoundSelect { table, columns }))
    }

    fn column_ref(index: usize, column: &Column) -> BoundColumnRef {
        BoundColumnRef {
            name: column.name.clone(),
            index,
            data_type: column.data_type,
            is_primary: column.is_primary,
        }
    }

    fn bind_insert(&self, stmt: &InsertStatement) -> Result<BoundStatement> {
        let table = self.resolve_table(&stmt.table)?;
        let column_count = table.schema.column_count();

        let mut rows = Vec::with_capacity(stmt.rows.len());
        for literals in &stmt.rows {
            if literals.len() != column_count {
                bail!(EngineError::Schema(format!(
                    "INSERT has {} values but table '{}' has {} columns",
                    literals.len(),
                    stmt.table,
                    column_count
                )));
            }

            let mut values = Vec::with_capacity(column_count);
            for (literal, column) in literals.iter().zip(&table.schema.columns) {
                values.push(Self::bind_literal(literal, column)?);
            }
            rows.push(values);
        }

        Ok(BoundStatement::Insert(BoundInsert { table, rows }))
    }

    /// Literal-to-value conversion: INT takes integer literals, FLOAT
    /// takes numeric literals, CHAR takes anything (zero-padded later).
    fn bind_literal(literal: &Literal, column: &Column) -> Result<Value> {
        match (column.data_type, literal) {
            (DataType::Int, Literal::Number(text)) => match text.parse::<i32>() {
                Ok(v) => Ok(Value::Int(v)),
                Err(_) => bail!(EngineError::Type(format!(
                    "invalid integer literal '{text}' for column '{}'",
                    column.name
                ))),
            },
            (DataType::Float, Literal::Number(text)) => match text.parse::<f32>() {
                Ok(v) => Ok(Value::Float(v)),
                Err(_) => bail!(EngineError::Type(format!(
                    "invalid float literal '{text}' for column '{}'",
                    column.name
                ))),
            },
            (DataType::Char, Literal::Str(text)) | (DataType::Char, Literal::Number(text)) => {
                Ok(Value::Char(text.clone()))
            }
            (expected, Literal::Str(text)) => bail!(EngineError::Type(format!(
                "string literal '{text}' cannot be stored in {expected} column '{}'",
                column.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::BufferPoolManager;
    use crate::disk::DiskManager;
    use crate::parser::parse;
    use std::sync::{Arc, Mutex};

    fn open_catalog(dir: &tempfile::TempDir) -> Catalog {
        let disk = DiskManager::open(&dir.path().join("test.db")).unwrap();
        let bpm = Arc::new(Mutex::new(BufferPoolManager::new(disk)));
        let catalog = Catalog::open(bpm).unwrap();
        let mut schema = Schema::new();
        schema.add_column("id", DataType::Int, true).unwrap();
        schema.add_column("name", DataType::Char, false).unwrap();
        schema.add_column("score", DataType::Float, false).unwrap();
        catalog.create_table("users", &schema).unwrap();
        catalog
    }

    fn bind(catalog: &Catalog, sql: &str) -> Result<BoundStatement> {
        Binder::new(Some(catalog)).bind(&parse(sql).unwrap())
    }

    #[test]
    fn test_table_statements_require_a_database() {
        let binder = Binder::new(None);
        for sql in [
            "SHOW TABLES",
            "SELECT * FROM users",
            "INSERT INTO users VALUES (1)",
            "CREATE TABLE t (id INT)",
            "DROP TABLE t",
        ] {
            let err = binder.bind(&parse(sql).unwrap()).unwrap_err();
            assert!(err.to_string().contains("no database"), "{sql}");
        }
    }

    #[test]
    fn test_database_ops_bind_without_a_database() {
        let binder = Binder::new(None);
        for sql in ["SHOW DATABASES", "CREATE DATABASE d", "DROP DATABASE d"] {
            assert!(binder.bind(&parse(sql).unwrap()).is_ok(), "{sql}");
        }
    }

    #[test]
    fn test_select_star_expands_in_ordinal_order() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        let BoundStatement::Select(select) = bind(&catalog, "SELECT * FROM users").unwrap()
        else {
            panic!("expected select");
        };
        let names: Vec<&str> = select.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "score"]);
        assert_eq!(select.columns[0].index, 0);
        assert!(select.columns[0].is_primary);
    }

    #[test]
    fn test_select_named_columns() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        let BoundStatement::Select(select) =
            bind(&catalog, "SELECT score, id FROM users").unwrap()
        else {
            panic!("expected select");
        };
        assert_eq!(select.columns[0].index, 2);
        assert_eq!(select.columns[1].index, 0);
    }

    #[test]
    fn test_unknown_table_and_column() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);

        let err = bind(&catalog, "SELECT * FROM missing").unwrap_err();
        assert!(err.to_string().contains("missing"));

        let err = bind(&catalog, "SELECT foo FROM users").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("foo") && message.contains("users"));
    }

    #[test]
    fn test_insert_binds_typed_values() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        let BoundStatement::Insert(insert) =
            bind(&catalog, "INSERT INTO users VALUES (1, 'Alice', 95.5)").unwrap()
        else {
            panic!("expected insert");
        };
        assert_eq!(
            insert.rows,
            vec![vec![
                Value::Int(1),
                Value::Char("Alice".to_string()),
                Value::Float(95.5),
            ]]
        );
    }

    #[test]
    fn test_insert_arity_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        let err = bind(&catalog, "INSERT INTO users VALUES (3, 'Carol')").unwrap_err();
        let message = err.to_string();
        assert!(message.contains('2') && message.contains('3'));
    }

    #[test]
    fn test_insert_type_errors_name_the_column() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);

        let err = bind(&catalog, "INSERT INTO users VALUES ('x', 'Alice', 1.0)").unwrap_err();
        assert!(err.to_string().contains("id"));

        let err = bind(&catalog, "INSERT INTO users VALUES (1.5, 'Alice', 1.0)").unwrap_err();
        assert!(err.to_string().contains("type error"));

        // FLOAT accepts an integer literal; CHAR accepts a numeric one.
        assert!(bind(&catalog, "INSERT INTO users VALUES (1, 'Alice', 95)").is_ok());
        assert!(bind(&catalog, "INSERT INTO users VALUES (1, 42, 95.5)").is_ok());
    }

    #[test]
    fn test_bulk_insert_checks_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        assert!(bind(
            &catalog,
            "INSERT INTO users VALUES (1, 'a', 1.0), (2, 'b', 2.0)"
        )
        .is_ok());
        let err = bind(&catalog, "INSERT INTO users VALUES (1, 'a', 1.0), (2)").unwrap_err();
        assert!(err.to_string().contains("schema error"));
    }

    #[test]
    fn test_create_table_binds_schema() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        let BoundStatement::CreateTable(create) =
            bind(&catalog, "CREATE TABLE t (a INT, b CHAR PRIMARY KEY)").unwrap()
        else {
            panic!("expected create table");
        };
        assert_eq!(create.name, "t");
        assert_eq!(create.schema.column_count(), 2);
        assert!(create.schema.columns[1].is_primary);
    }

    #[test]
    fn test_create_table_rejects_duplicate_columns() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        let err = bind(&catalog, "CREATE TABLE t (a INT, a CHAR)").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_drop_table_must_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = open_catalog(&dir);
        assert!(bind(&catalog, "DROP TABLE users").is_ok());
        let err = bind(&catalog, "DROP TABLE missing").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
