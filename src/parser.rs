use anyhow::{bail, Result};

use crate::ast::{
    ColumnDef, CreateTableStatement, InsertStatement, Literal, SelectColumn, SelectStatement,
    Statement, TypeName,
};
use crate::error::EngineError;
use crate::lexer::{Lexer, Token};

/// Recursive, predictive, one token of lookahead.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> &Token {
        self.pos += 1;
        self.tokens.get(self.pos - 1).unwrap_or(&Token::Eof)
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let token = self.peek().clone();
        if token == expected {
            self.advance();
            Ok(())
        } else {
            bail!(EngineError::Syntax(format!(
                "expected {expected:?}, got {token:?}"
            )));
        }
    }

    pub fn parse(&mut self) -> Result<Statement> {
        let stmt = match self.peek() {
            Token::Show => self.parse_show()?,
            Token::Create => self.parse_create()?,
            Token::Drop => self.parse_drop()?,
            Token::Use => {
                self.advance();
                Statement::UseDatabase(self.parse_ident()?)
            }
            Token::Select => self.parse_select()?,
            Token::Insert => self.parse_insert()?,
            Token::Exit => {
                self.advance();
                Statement::Exit
            }
            token => bail!(EngineError::Syntax(format!("unexpected token {token:?}"))),
        };

        // Optional statement terminator
        if self.peek() == &Token::Semicolon {
            self.advance();
        }
        if self.peek() != &Token::Eof {
            bail!(EngineError::Syntax(format!(
                "unexpected trailing input {:?}",
                self.peek()
            )));
        }

        Ok(stmt)
    }

    fn parse_show(&mut self) -> Result<Statement> {
        self.expect(Token::Show)?;
        match self.peek() {
            Token::Databases => {
                self.advance();
                Ok(Statement::ShowDatabases)
            }
            Token::Tables => {
                self.advance();
                Ok(Statement::ShowTables)
            }
            token => bail!(EngineError::Syntax(format!(
                "expected DATABASES or TABLES after SHOW, got {token:?}"
            ))),
        }
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(Token::Create)?;
        match self.peek() {
            Token::Database => {
                self.advance();
                Ok(Statement::CreateDatabase(self.parse_ident()?))
            }
            Token::Table => self.parse_create_table(),
            token => bail!(EngineError::Syntax(format!(
                "expected DATABASE or TABLE after CREATE, got {token:?}"
            ))),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        self.expect(Token::Table)?;
        let table = self.parse_ident()?;
        self.expect(Token::LParen)?;

        let mut columns = Vec::new();
        loop {
            let name = self.parse_ident()?;
            let type_name = self.parse_type_name()?;
            let primary_key = self.parse_primary_key_clause()?;
            columns.push(ColumnDef {
                name,
                type_name,
                primary_key,
            });

            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RParen)?;
        Ok(Statement::CreateTable(CreateTableStatement {
            table,
            columns,
        }))
    }

    fn parse_type_name(&mut self) -> Result<TypeName> {
        match self.peek() {
            Token::Int => {
                self.advance();
                Ok(TypeName::Int)
            }
            Token::Float => {
                self.advance();
                Ok(TypeName::Float)
            }
            Token::Char => {
                self.advance();
                Ok(TypeName::Char)
            }
            token => bail!(EngineError::Syntax(format!(
                "expected column type, got {token:?}"
            ))),
        }
    }

    /// Both `PRIMARY KEY` and the single keyword `PRIMARY_KEY` mark the
    /// primary column.
    fn parse_primary_key_clause(&mut self) -> Result<bool> {
        match self.peek().clone() {
            Token::PrimaryKey => {
                self.advance();
                Ok(true)
            }
            Token::Ident(word) if word.eq_ignore_ascii_case("primary") => {
                self.advance();
                match self.peek().clone() {
                    Token::Ident(next) if next.eq_ignore_ascii_case("key") => {
                        self.advance();
                        Ok(true)
                    }
                    token => bail!(EngineError::Syntax(format!(
                        "expected KEY after PRIMARY, got {token:?}"
                    ))),
                }
            }
            _ => Ok(false),
        }
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(Token::Drop)?;
        match self.peek() {
            Token::Database => {
                self.advance();
                Ok(Statement::DropDatabase(self.parse_ident()?))
            }
            Token::Table => {
                self.advance();
                Ok(Statement::DropTable(self.parse_ident()?))
            }
            token => bail!(EngineError::Syntax(format!(
                "expected DATABASE or TABLE after DROP, got {token:?}"
            ))),
        }
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(Token::Select)?;

        let projections = if self.peek() == &Token::Asterisk {
            self.advance();
            vec![SelectColumn::Asterisk]
        } else {
            let mut columns = Vec::new();
            loop {
                columns.push(SelectColumn::Name(self.parse_ident()?));
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            columns
        };

        self.expect(Token::From)?;
        let table = self.parse_ident()?;

        Ok(Statement::Select(SelectStatement { projections, table }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(Token::Insert)?;
        self.expect(Token::Into)?;
        let table = self.parse_ident()?;
        self.expect(Token::Values)?;

        let mut rows = Vec::new();
        loop {
            self.expect(Token::LParen)?;
            let mut values = Vec::new();
            loop {
                values.push(self.parse_literal()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(Token::RParen)?;
            rows.push(values);

            // Bulk form: further parenthesized tuples after commas.
            if self.peek() == &Token::Comma {
                self.advance();
            } else {
                break;
            }
        }

        Ok(Statement::Insert(InsertStatement { table, rows }))
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.peek().clone() {
            Token::Number(s) => {
                self.advance();
                Ok(Literal::Number(s))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Literal::Str(s))
            }
            token => bail!(EngineError::Syntax(format!(
                "expected literal, got {token:?}"
            ))),
        }
    }

    fn parse_ident(&mut self) -> Result<String> {
        match self.peek().clone() {
            Token::Ident(s) => {
                self.advance();
                Ok(s)
            }
            token => bail!(EngineError::Syntax(format!(
                "expected identifier, got {token:?}"
            ))),
        }
    }
}

pub fn parse(sql: &str) -> Result<Statement> {
    let tokens = Lexer::new(sql).tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_statements() {
        assert_eq!(parse("SHOW DATABASES").unwrap(), Statement::ShowDatabases);
        assert_eq!(parse("SHOW TABLES;").unwrap(), Statement::ShowTables);
        assert_eq!(
            parse("CREATE DATABASE demo").unwrap(),
            Statement::CreateDatabase("demo".to_string())
        );
        assert_eq!(
            parse("DROP DATABASE demo").unwrap(),
            Statement::DropDatabase("demo".to_string())
        );
        assert_eq!(
            parse("use demo;").unwrap(),
            Statement::UseDatabase("demo".to_string())
        );
        assert_eq!(parse("EXIT").unwrap(), Statement::Exit);
    }

    #[test]
    fn test_create_table() {
        let stmt = parse("CREATE TABLE users (id INT PRIMARY KEY, name CHAR, score FLOAT)")
            .unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.table, "users");
        assert_eq!(create.columns.len(), 3);
        assert_eq!(create.columns[0].name, "id");
        assert_eq!(create.columns[0].type_name, TypeName::Int);
        assert!(create.columns[0].primary_key);
        assert_eq!(create.columns[1].type_name, TypeName::Char);
        assert!(!create.columns[1].primary_key);
        assert_eq!(create.columns[2].type_name, TypeName::Float);
    }

    #[test]
    fn test_create_table_single_token_primary_key() {
        let stmt = parse("CREATE TABLE t (id INT PRIMARY_KEY)").unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("expected CREATE TABLE");
        };
        assert!(create.columns[0].primary_key);
    }

    #[test]
    fn test_select_star_and_columns() {
        assert_eq!(
            parse("SELECT * FROM users").unwrap(),
            Statement::Select(SelectStatement {
                projections: vec![SelectColumn::Asterisk],
                table: "users".to_string(),
            })
        );
        assert_eq!(
            parse("SELECT name, score FROM users;").unwrap(),
            Statement::Select(SelectStatement {
                projections: vec![
                    SelectColumn::Name("name".to_string()),
                    SelectColumn::Name("score".to_string()),
                ],
                table: "users".to_string(),
            })
        );
    }

    #[test]
    fn test_insert_single_row() {
        let stmt = parse("INSERT INTO users VALUES (1, 'Alice', 95.5)").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.table, "users");
        assert_eq!(
            insert.rows,
            vec![vec![
                Literal::Number("1".to_string()),
                Literal::Str("Alice".to_string()),
                Literal::Number("95.5".to_string()),
            ]]
        );
    }

    #[test]
    fn test_insert_bulk_rows() {
        let stmt = parse("INSERT INTO t VALUES (1, 'a'), (2, 'b'), (3, 'c')").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.rows.len(), 3);
        assert_eq!(insert.rows[2][0], Literal::Number("3".to_string()));
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(
            parse("DROP TABLE users").unwrap(),
            Statement::DropTable("users".to_string())
        );
    }

    #[test]
    fn test_syntax_errors_name_the_token() {
        let err = parse("SELECT FROM users").unwrap_err();
        assert!(err.to_string().contains("syntax error"));

        let err = parse("CREATE users").unwrap_err();
        assert!(err.to_string().contains("CREATE"));

        let err = parse("DELETE FROM users").unwrap_err();
        assert!(err.to_string().contains("syntax error"));

        let err = parse("SELECT * FROM users extra").unwrap_err();
        assert!(err.to_string().contains("trailing"));
    }

    #[test]
    fn test_unsupported_keywords_are_rejected() {
        assert!(parse("HELP").is_err());
        assert!(parse("UPDATE users SET name = 'x'").is_err());
        assert!(parse("SELECT * FROM a JOIN b ON a.id = b.id").is_err());
    }

    #[test]
    fn test_empty_input_is_a_syntax_error() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
    }
}
