//! Views, comments, types and materialized views.

use serde::Serialize;

use super::cursor::{span_of, Cursor};
use super::error::ParseError;
use crate::lexer::{Keyword, TokenKind};
use crate::schema::PgTypeKind;

/// A matched `CREATE [OR REPLACE] VIEW`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateView {
    pub name: String,
    pub or_replace: bool,
    /// Query text after `AS`.
    pub body: String,
}

/// Matches `CREATE [OR REPLACE] [TEMP] [RECURSIVE] VIEW name [(cols)]
/// [WITH (...)] AS query`.
///
/// # Errors
///
/// Returns a `ParseError` for anything else, including materialized views.
pub fn parse_create_view(sql: &str) -> Result<CreateView, ParseError> {
    let mut cursor = Cursor::new(sql);
    cursor.expect_keyword(Keyword::Create)?;
    let or_replace = cursor.eat_keyword(Keyword::Or);
    if or_replace {
        cursor.expect_keyword(Keyword::Replace)?;
    }
    let _ = cursor.eat_keyword(Keyword::Temp) || cursor.eat_keyword(Keyword::Temporary);
    let _ = cursor.eat_keyword(Keyword::Recursive);
    cursor.expect_keyword(Keyword::View)?;
    let name = cursor.expect_object_name()?;
    if cursor.check(&TokenKind::LeftParen) {
        cursor.parenthesized()?;
    }
    if cursor.eat_keyword(Keyword::With) {
        cursor.parenthesized()?;
    }
    cursor.expect_keyword(Keyword::As)?;
    let body = cursor.rest_text().to_string();
    if body.is_empty() {
        return Err(ParseError::new("view has no query", cursor.current().span));
    }
    Ok(CreateView {
        name,
        or_replace,
        body,
    })
}

/// Matches `CREATE MATERIALIZED VIEW [IF NOT EXISTS] name ...` and returns
/// the view name.
///
/// # Errors
///
/// Returns a `ParseError` for any other statement.
pub fn parse_materialized_view(sql: &str) -> Result<String, ParseError> {
    let mut cursor = Cursor::new(sql);
    cursor.expect_keyword(Keyword::Create)?;
    cursor.expect_keyword(Keyword::Materialized)?;
    cursor.expect_keyword(Keyword::View)?;
    cursor.eat_if_not_exists()?;
    cursor.expect_object_name()
}

/// What a `COMMENT ON` statement targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CommentTarget {
    Table(String),
    View(String),
    Column { table: String, column: String },
}

impl CommentTarget {
    /// The relation that owns the comment.
    #[must_use]
    pub fn relation(&self) -> &str {
        match self {
            Self::Table(name) | Self::View(name) => name,
            Self::Column { table, .. } => table,
        }
    }
}

/// A matched `COMMENT ON ... IS ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub target: CommentTarget,
    /// `None` for `IS NULL`.
    pub text: Option<String>,
}

/// Matches `COMMENT ON {TABLE|VIEW|MATERIALIZED VIEW|COLUMN} target IS
/// 'text' | NULL`.
///
/// # Errors
///
/// Returns a `ParseError` for other comment targets and other statements.
pub fn parse_comment(sql: &str) -> Result<Comment, ParseError> {
    let mut cursor = Cursor::new(sql);
    cursor.expect_keyword(Keyword::Comment)?;
    cursor.expect_keyword(Keyword::On)?;

    let target = if cursor.eat_keyword(Keyword::Table) {
        CommentTarget::Table(cursor.expect_object_name()?)
    } else if cursor.eat_keyword(Keyword::View) {
        CommentTarget::View(cursor.expect_object_name()?)
    } else if cursor.eat_keyword(Keyword::Materialized) {
        cursor.expect_keyword(Keyword::View)?;
        CommentTarget::View(cursor.expect_object_name()?)
    } else if cursor.eat_keyword(Keyword::Column) {
        let span = cursor.current().span;
        let mut parts = cursor.expect_qualified_parts()?;
        let column = parts.pop();
        let table = parts.pop();
        match (table, column) {
            (Some(table), Some(column)) => CommentTarget::Column { table, column },
            _ => return Err(ParseError::new("expected table.column", span)),
        }
    } else {
        return Err(ParseError::unexpected(
            "TABLE, VIEW or COLUMN",
            cursor.current().kind.clone(),
            cursor.current().span,
        ));
    };

    cursor.expect_keyword(Keyword::Is)?;
    let text = match &cursor.current().kind {
        TokenKind::String(text) | TokenKind::DollarString(text) => Some(text.clone()),
        TokenKind::Keyword(Keyword::Null) => None,
        other => {
            return Err(ParseError::unexpected(
                "string or NULL",
                other.clone(),
                cursor.current().span,
            ))
        }
    };
    cursor.advance();
    cursor.expect_end()?;

    Ok(Comment { target, text })
}

/// A matched `CREATE TYPE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateType {
    pub name: String,
    pub kind: PgTypeKind,
    /// Enum labels in declaration order.
    pub labels: Vec<String>,
}

/// Matches `CREATE TYPE name AS ENUM (...)`, `AS (...)` or any other
/// `CREATE TYPE name ...` form.
///
/// # Errors
///
/// Returns a `ParseError` when the statement is not a `CREATE TYPE`.
pub fn parse_create_type(sql: &str) -> Result<CreateType, ParseError> {
    let mut cursor = Cursor::new(sql);
    cursor.expect_keyword(Keyword::Create)?;
    cursor.expect_keyword(Keyword::Type)?;
    let name = cursor.expect_object_name()?;

    if !cursor.eat_keyword(Keyword::As) {
        cursor.skip_rest();
        return Ok(CreateType {
            name,
            kind: PgTypeKind::Other,
            labels: Vec::new(),
        });
    }

    if cursor.eat_keyword(Keyword::Enum) {
        let src = cursor.src();
        let labels = cursor
            .parenthesized()?
            .into_iter()
            .map(|range| {
                let tokens = cursor.tokens(range);
                match tokens {
                    [token] => match &token.kind {
                        TokenKind::String(label) => Ok(label.clone()),
                        other => Err(ParseError::unexpected("enum label", other.clone(), token.span)),
                    },
                    _ => Err(ParseError::new(
                        format!("bad enum label {}", span_of(tokens).unwrap_or_default().text(src)),
                        span_of(tokens).unwrap_or_default(),
                    )),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        cursor.expect_end()?;
        return Ok(CreateType {
            name,
            kind: PgTypeKind::Enum,
            labels,
        });
    }

    let kind = if cursor.check(&TokenKind::LeftParen) {
        PgTypeKind::Composite
    } else {
        PgTypeKind::Other
    };
    cursor.skip_rest();
    Ok(CreateType {
        name,
        kind,
        labels: Vec::new(),
    })
}
