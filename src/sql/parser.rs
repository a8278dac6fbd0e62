//! Tolerant parser for CREATE TABLE statements.
//!
//! Input is split into statements on `;`. Each CREATE TABLE statement is
//! parsed on its own; one that cannot be read is reported and skipped,
//! and parsing carries on with the next. ALTER/DROP statements are only
//! classified, never applied.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::lexer::{Keyword, Lexer, Token};
use crate::model::{Column, Position, Relationship, Table, new_id};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("CREATE TABLE statement has no table name")]
    MissingTableName,
    #[error("CREATE TABLE {0} has no column block")]
    MissingColumnBlock(String),
    #[error("CREATE TABLE {0} has an unterminated column block")]
    UnterminatedColumnBlock(String),
}

/// A statement the parser recognized as DDL but could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedStatement {
    /// Zero-based position among the non-empty statements of the input.
    pub index: usize,
    #[serde(serialize_with = "as_display")]
    pub error: StatementError,
}

fn as_display<S: serde::Serializer>(error: &StatementError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlterKind {
    AddColumn,
    DropColumn,
    AddConstraint,
    DropConstraint,
    DropTable,
    Unknown,
}

/// What an ALTER/DROP statement would do. Used for feedback only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlterIntent {
    pub table: Option<String>,
    pub kind: AlterKind,
}

#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub tables: Vec<Table>,
    pub alters: Vec<AlterIntent>,
    pub skipped: Vec<SkippedStatement>,
}

/// Parse every statement of a DDL script.
pub fn parse_statements(input: &str) -> ParseOutcome {
    let tokens = Lexer::new(input).tokenize();
    let mut outcome = ParseOutcome::default();

    for (index, statement) in split_statements(&tokens).into_iter().enumerate() {
        let head = statement.first().and_then(Token::keyword);
        let second = statement.get(1).and_then(Token::keyword);
        match (head, second) {
            (Some(Keyword::Create), Some(Keyword::Table)) => {
                match Parser::new(statement).parse_create_table() {
                    Ok(table) => {
                        debug!(table = %table.name, columns = table.columns.len(), "parsed CREATE TABLE");
                        outcome.tables.push(table);
                    }
                    Err(error) => {
                        warn!(index, %error, "skipping statement");
                        outcome.skipped.push(SkippedStatement { index, error });
                    }
                }
            }
            (Some(Keyword::Alter | Keyword::Drop), _) => {
                outcome.alters.push(classify(statement));
            }
            _ => debug!(index, "ignoring non-DDL statement"),
        }
    }

    outcome
}

/// Parse only the CREATE TABLE statements of a script.
pub fn parse_create_table_statements(input: &str) -> Vec<Table> {
    parse_statements(input).tables
}

/// Classify a single ALTER TABLE / DROP TABLE statement.
pub fn parse_alter_statement(input: &str) -> AlterIntent {
    let tokens = Lexer::new(input).tokenize();
    split_statements(&tokens)
        .into_iter()
        .next()
        .map(classify)
        .unwrap_or(AlterIntent {
            table: None,
            kind: AlterKind::Unknown,
        })
}

fn split_statements(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| matches!(t, Token::Semicolon | Token::Eof))
        .filter(|s| !s.is_empty())
        .collect()
}

fn classify(statement: &[Token]) -> AlterIntent {
    let mut parser = Parser::new(statement);
    let head = parser.current().keyword();
    parser.advance();

    if !parser.current().is(Keyword::Table) {
        return AlterIntent {
            table: None,
            kind: AlterKind::Unknown,
        };
    }
    parser.advance();
    parser.skip_if_exists();
    if parser.current().is(Keyword::Only) {
        parser.advance();
    }
    let table = parser.qualified_name();

    if head == Some(Keyword::Drop) {
        return AlterIntent {
            table,
            kind: AlterKind::DropTable,
        };
    }

    let kind = loop {
        match parser.current() {
            Token::Keyword(kw @ (Keyword::Add | Keyword::Drop), _) => {
                let adding = *kw == Keyword::Add;
                parser.advance();
                let constraint = matches!(
                    parser.current().keyword(),
                    Some(Keyword::Constraint | Keyword::Primary | Keyword::Foreign | Keyword::Unique)
                );
                break match (adding, constraint) {
                    (true, true) => AlterKind::AddConstraint,
                    (true, false) => AlterKind::AddColumn,
                    (false, true) => AlterKind::DropConstraint,
                    (false, false) => AlterKind::DropColumn,
                };
            }
            Token::Eof => break AlterKind::Unknown,
            _ => parser.advance(),
        }
    };

    AlterIntent { table, kind }
}

fn random_position() -> Position {
    let mut rng = rand::thread_rng();
    Position {
        x: rng.gen_range(50.0..550.0),
        y: rng.gen_range(50.0..450.0),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_if_exists(&mut self) {
        if self.current().is(Keyword::If) {
            self.advance();
            if self.current().is(Keyword::Not) {
                self.advance();
            }
            if self.current().is(Keyword::Exists) {
                self.advance();
            }
        }
    }

    /// `name` or `schema.name`; the last part wins.
    fn qualified_name(&mut self) -> Option<String> {
        if matches!(self.current(), Token::LParen | Token::Eof) {
            return None;
        }
        let mut name = self.current().word()?;
        self.advance();
        while self.current() == &Token::Dot {
            self.advance();
            if let Some(part) = self.current().word() {
                name = part;
                self.advance();
            }
        }
        Some(name)
    }

    fn parse_create_table(&mut self) -> Result<Table, StatementError> {
        self.advance(); // CREATE
        self.advance(); // TABLE
        self.skip_if_exists();

        let name = self.qualified_name().ok_or(StatementError::MissingTableName)?;

        if self.current() != &Token::LParen {
            return Err(StatementError::MissingColumnBlock(name));
        }
        self.advance();

        let start = self.pos;
        let mut depth = 1;
        while depth > 0 {
            match self.current() {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Eof => return Err(StatementError::UnterminatedColumnBlock(name)),
                _ => {}
            }
            self.advance();
        }
        let body = &self.tokens[start..self.pos - 1];

        // Plain depth-0 comma split. Table-level clauses such as
        // `PRIMARY KEY (a, b)` are not recognized and come out as a
        // column named PRIMARY.
        let columns = split_top_level(body)
            .into_iter()
            .filter_map(|fragment| parse_column(&name, fragment))
            .collect();

        Ok(Table {
            id: new_id(),
            name,
            columns,
            position: random_position(),
            row_count: 0,
            data: vec![],
        })
    }
}

fn split_top_level(body: &[Token]) -> Vec<&[Token]> {
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in body.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                fragments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fragments.push(&body[start..]);
    fragments.into_iter().filter(|f| !f.is_empty()).collect()
}

/// Token 0 is the name, token 1 (with any parenthesized suffix) the type;
/// the rest are scanned for column constraints.
fn parse_column(table: &str, fragment: &[Token]) -> Option<Column> {
    let name = fragment.first()?.word()?;
    let Some(type_word) = fragment.get(1).and_then(Token::word) else {
        debug!(table, column = %name, "column fragment has no type");
        return None;
    };

    let mut data_type = type_word;
    let mut i = 2;
    if fragment.get(i) == Some(&Token::LParen) {
        let end = group_end(fragment, i);
        data_type.extend(fragment[i..end].iter().map(Token::text));
        i = end;
    }

    let mut column = Column::new(name, data_type);
    column.is_primary_key = fragment
        .windows(2)
        .any(|w| w[0].is(Keyword::Primary) && w[1].is(Keyword::Key));

    while i < fragment.len() {
        match fragment[i].keyword() {
            Some(Keyword::Not) if fragment.get(i + 1).is_some_and(|t| t.is(Keyword::Null)) => {
                column.nullable = false;
                i += 1;
            }
            Some(Keyword::Unique) => column.is_unique = true,
            Some(Keyword::Default) => {
                let (value, next) = default_literal(fragment, i + 1);
                column.default_value = value;
                i = next;
                continue;
            }
            Some(Keyword::References) => {
                let (target, target_column, next) = reference(fragment, i + 1);
                if let Some(target) = target {
                    let constraint =
                        Relationship::constraint_name_for(table, &column.name, &target, &target_column);
                    column.set_foreign_key(&target, &target_column, &constraint);
                }
                i = next;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    Some(column)
}

/// Index one past the `)` closing the group opened at `open`.
fn group_end(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

fn default_literal(tokens: &[Token], at: usize) -> (Option<String>, usize) {
    match tokens.get(at) {
        None => (None, at),
        Some(Token::LParen) => {
            let end = group_end(tokens, at);
            (Some(render(&tokens[at..end])), end)
        }
        Some(token @ Token::Ident(_)) if tokens.get(at + 1) == Some(&Token::LParen) => {
            let end = group_end(tokens, at + 1);
            let mut call = token.text();
            call.push_str(&render(&tokens[at + 1..end]));
            (Some(call), end)
        }
        Some(token) => (Some(token.text()), at + 1),
    }
}

fn render(tokens: &[Token]) -> String {
    tokens.iter().map(Token::text).collect()
}

/// `table[.table] [(column)]`; the column defaults to `id`.
fn reference(tokens: &[Token], at: usize) -> (Option<String>, String, usize) {
    let mut i = at;
    let mut target = None;
    while let Some(word) = tokens.get(i).and_then(Token::word) {
        target = Some(word);
        i += 1;
        if tokens.get(i) == Some(&Token::Dot) {
            i += 1;
        } else {
            break;
        }
    }

    let mut column = "id".to_string();
    if tokens.get(i) == Some(&Token::LParen) {
        if let Some(word) = tokens.get(i + 1).and_then(Token::word) {
            column = word;
        }
        i = group_end(tokens, i);
    }
    (target, column, i)
}
