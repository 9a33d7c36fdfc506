use crate::binder::{
    BoundColumnRef, BoundDatabaseOp, BoundStatement, DatabaseOpKind,
};
use crate::catalog::TableRef;
use crate::tuple::{Schema, Value};

#[derive(Debug, Clone)]
pub enum Plan {
    SeqScan(SeqScanPlan),
    Projection(ProjectionPlan),
    Insert(InsertPlan),
    CreateTable(CreateTablePlan),
    DropTable(DropTablePlan),
    ShowTables,
    DatabaseOp(DatabaseOpPlan),
}

#[derive(Debug, Clone)]
pub struct SeqScanPlan {
    pub table: TableRef,
}

#[derive(Debug, Clone)]
pub struct ProjectionPlan {
    pub columns: Vec<BoundColumnRef>,
    pub child: Box<Plan>,
}

#[derive(Debug, Clone)]
pub struct InsertPlan {
    pub table: TableRef,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct CreateTablePlan {
    pub name: String,
    pub schema: Schema,
}

#[derive(Debug, Clone)]
pub struct DropTablePlan {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseOpPlan {
    pub kind: DatabaseOpKind,
    pub name: Option<String>,
}

/// One-to-one lowering of bound statements. The only composite shape is
/// SELECT, which becomes a projection over a sequential scan.
pub fn plan(stmt: BoundStatement) -> Plan {
    match stmt {
        BoundStatement::Select(select) => Plan::Projection(ProjectionPlan {
            columns: select.columns,
            child: Box::new(Plan::SeqScan(SeqScanPlan {
                table: select.table,
            })),
        }),
        BoundStatement::Insert(insert) => Plan::Insert(InsertPlan {
            table: insert.table,
            rows: insert.rows,
        }),
        BoundStatement::CreateTable(create) => Plan::CreateTable(CreateTablePlan {
            name: create.name,
            schema: create.schema,
        }),
        BoundStatement::DropTable(drop) => Plan::DropTable(DropTablePlan { name: drop.name }),
        BoundStatement::ShowTables => Plan::ShowTables,
        BoundStatement::DatabaseOp(BoundDatabaseOp { kind, name }) => {
            Plan::DatabaseOp(DatabaseOpPlan { kind, name })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BoundSelect;

    #[test]
    fn test_select_lowers_to_projection_over_scan() {
        let table = TableRef {
            table_id: 2,
            name: "users".to_string(),
            first_page_id: 3,
            schema: Schema::new(),
        };
        let stmt = BoundStatement::Select(BoundSelect {
            table: table.clone(),
            columns: Vec::new(),
        });
        let Plan::Projection(projection) = plan(stmt) else {
            panic!("expected projection root");
        };
        let Plan::SeqScan(scan) = *projection.child else {
            panic!("expected seq scan child");
        };
        assert_eq!(scan.table.name, table.name);
    }

    #[test]
    fn test_database_ops_lower_directly() {
        let stmt = BoundStatement::DatabaseOp(BoundDatabaseOp {
            kind: DatabaseOpKind::Show,
            name: None,
        });
        assert!(matches!(plan(stmt), Plan::DatabaseOp(p) if p.kind == DatabaseOpKind::Show));
    }
}
