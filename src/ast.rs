// SQL Abstract Syntax Tree

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    ShowDatabases,
    ShowTables,
    CreateDatabase(String),
    DropDatabase(String),
    UseDatabase(String),
    CreateTable(CreateTableStatement),
    DropTable(String),
    Select(SelectStatement),
    Insert(InsertStatement),
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub type_name: TypeName,
    pub primary_key: bool,
}

/// Type name as written in DDL; the binder maps it to a storage type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Int,
    Float,
    Char,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub projections: Vec<SelectColumn>,
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumn {
    Asterisk,
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// One entry per parenthesized tuple; the bulk form supplies several.
    pub rows: Vec<Vec<Literal>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(String),
    Str(String),
}
