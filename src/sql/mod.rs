//! DDL text handling: lexing, parsing and dialect syntax.

mod dialect;
mod lexer;
mod parser;
mod types;

pub use dialect::Dialect;
pub use parser::{
    AlterIntent, AlterKind, ParseOutcome, SkippedStatement, StatementError, parse_alter_statement,
    parse_create_table_statements, parse_statements,
};
pub use types::TypeClass;
