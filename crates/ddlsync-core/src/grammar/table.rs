//! `CREATE TABLE`, column definitions and `PARTITION OF`.

use serde::Serialize;

use super::cursor::{span_of, word_text, Cursor};
use super::error::ParseError;
use super::render::render;
use crate::lexer::{Keyword, Lexer, Token, TokenKind};
use crate::schema::type_length;

/// A declared column, as written in a `CREATE TABLE` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDecl {
    pub name: String,
    /// Type with canonical spacing, e.g. `character varying(64)`.
    pub type_text: String,
    /// First type modifier (`64` for `varchar(64)`).
    pub length: Option<i32>,
    pub is_array: bool,
    /// `DEFAULT` expression text as written.
    pub default: Option<String>,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// Table named by an inline `REFERENCES`.
    pub references: Option<String>,
    /// The whole element text, usable after `ADD COLUMN`.
    pub definition: String,
}

/// A matched `CREATE TABLE name ( ... )`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    /// Column elements only; table constraints are left out.
    pub columns: Vec<ColumnDecl>,
    /// Columns of the table-level `PRIMARY KEY (...)`.
    pub primary_key: Vec<String>,
}

impl CreateTable {
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDecl> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A matched `CREATE TABLE name PARTITION OF parent ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionOf {
    pub name: String,
    pub parent: String,
}

/// Consumes `CREATE [GLOBAL|LOCAL] [TEMP|TEMPORARY|UNLOGGED] TABLE
/// [IF NOT EXISTS] name` and returns `(name, if_not_exists)`.
fn create_table_head(cursor: &mut Cursor<'_>) -> Result<(String, bool), ParseError> {
    cursor.expect_keyword(Keyword::Create)?;
    let _ = cursor.eat_keyword(Keyword::Global) || cursor.eat_keyword(Keyword::Local);
    let _ = cursor.eat_keyword(Keyword::Temp)
        || cursor.eat_keyword(Keyword::Temporary)
        || cursor.eat_keyword(Keyword::Unlogged);
    cursor.expect_keyword(Keyword::Table)?;
    let if_not_exists = cursor.eat_if_not_exists()?;
    let name = cursor.expect_object_name()?;
    Ok((name, if_not_exists))
}

/// Matches `CREATE TABLE name ( elements ) ...`.
///
/// # Errors
///
/// Returns a `ParseError` when the statement is not a column-list
/// `CREATE TABLE` (partitions and typed tables do not match).
pub fn parse_create_table(sql: &str) -> Result<CreateTable, ParseError> {
    let mut cursor = Cursor::new(sql);
    let (name, if_not_exists) = create_table_head(&mut cursor)?;
    let elements = cursor.parenthesized()?;

    let mut columns = Vec::new();
    let mut primary_key = Vec::new();
    for range in elements {
        let tokens = cursor.tokens(range);
        match table_constraint(sql, tokens)? {
            Some(pk) => primary_key.extend(pk),
            None if is_constraint_element(tokens) => {}
            None => columns.push(column_from_tokens(sql, tokens)?),
        }
    }

    for column in &mut columns {
        if primary_key.contains(&column.name) {
            column.primary_key = true;
        }
    }

    // INHERITS, PARTITION BY, WITH and TABLESPACE clauses may follow.
    cursor.skip_rest();

    Ok(CreateTable {
        name,
        if_not_exists,
        columns,
        primary_key,
    })
}

fn is_constraint_element(tokens: &[Token]) -> bool {
    matches!(
        tokens.first().and_then(Token::as_keyword),
        Some(
            Keyword::Primary
                | Keyword::Constraint
                | Keyword::Unique
                | Keyword::Foreign
                | Keyword::Check
                | Keyword::Exclude
                | Keyword::Like
        )
    )
}

/// Returns the column list of a table-level primary key element, `None`
/// for any other element.
fn table_constraint(src: &str, tokens: &[Token]) -> Result<Option<Vec<String>>, ParseError> {
    let mut rest = tokens;
    if rest.first().and_then(Token::as_keyword) == Some(Keyword::Constraint) {
        rest = rest.get(2..).unwrap_or_default();
    }
    if rest.first().and_then(Token::as_keyword) != Some(Keyword::Primary) {
        return Ok(None);
    }
    let span = span_of(rest).unwrap_or_default();
    let mut cursor = Cursor::new(span.text(src));
    cursor.expect_keyword(Keyword::Primary)?;
    cursor.expect_keyword(Keyword::Key)?;
    Ok(Some(cursor.name_list()?))
}

const fn starts_constraint(token: &Token) -> bool {
    matches!(
        token.as_keyword(),
        Some(
            Keyword::Default
                | Keyword::Not
                | Keyword::Null
                | Keyword::Primary
                | Keyword::Unique
                | Keyword::References
                | Keyword::Check
                | Keyword::Constraint
                | Keyword::Collate
                | Keyword::Generated
        )
    )
}

/// Index of the next constraint keyword at paren depth zero, at or after
/// `from`.
fn next_constraint(tokens: &[Token], from: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(from) {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => depth = depth.saturating_sub(1),
            _ if depth == 0 && starts_constraint(token) => return i,
            _ => {}
        }
    }
    tokens.len()
}

fn column_from_tokens(src: &str, tokens: &[Token]) -> Result<ColumnDecl, ParseError> {
    let span = span_of(tokens).unwrap_or_default();
    let first = tokens
        .first()
        .ok_or_else(|| ParseError::new("empty column definition", span))?;
    let name = word_text(first, src)
        .ok_or_else(|| ParseError::unexpected("column name", first.kind.clone(), first.span))?;

    let type_end = next_constraint(tokens, 1);
    let type_tokens = &tokens[1..type_end];
    if type_tokens.is_empty() {
        return Err(ParseError::new(format!("column {name} has no type"), span));
    }
    let type_text = render(src, type_tokens);
    let is_array = type_tokens.iter().any(|t| {
        matches!(t.kind, TokenKind::LeftBracket) || t.as_keyword() == Some(Keyword::Array)
    });

    let mut decl = ColumnDecl {
        name,
        length: type_length(&type_text),
        type_text,
        is_array,
        default: None,
        not_null: false,
        primary_key: false,
        unique: false,
        references: None,
        definition: span.text(src).trim().to_string(),
    };

    let mut i = type_end;
    while i < tokens.len() {
        let keyword = tokens[i].as_keyword();
        i += 1;
        match keyword {
            Some(Keyword::Default) => {
                // The expression owns at least one token, so `DEFAULT NULL`
                // does not end at the NULL keyword.
                let end = next_constraint(tokens, (i + 1).min(tokens.len()));
                let text = span_of(&tokens[i..end])
                    .map(|s| s.text(src).trim().to_string())
                    .filter(|t| !t.eq_ignore_ascii_case("null"));
                decl.default = text;
                i = end;
            }
            Some(Keyword::Not) if tokens.get(i).and_then(Token::as_keyword) == Some(Keyword::Null) => {
                decl.not_null = true;
                i += 1;
            }
            Some(Keyword::Primary) => {
                decl.primary_key = true;
                i = next_constraint(tokens, i);
            }
            Some(Keyword::Unique) => decl.unique = true,
            Some(Keyword::References) => {
                decl.references = tokens.get(i..).and_then(|rest| referenced_table(src, rest));
                i = next_constraint(tokens, i);
            }
            Some(Keyword::Generated) => {
                // GENERATED BY DEFAULT AS IDENTITY: that DEFAULT is not a
                // column default.
                if matches!(&tokens.get(i).map(|t| &t.kind), Some(TokenKind::Identifier(w)) if w.eq_ignore_ascii_case("by"))
                {
                    i += 2;
                }
                i = next_constraint(tokens, i.min(tokens.len()));
            }
            Some(Keyword::Constraint | Keyword::Collate) => i += 1,
            _ => i = next_constraint(tokens, i),
        }
    }

    Ok(decl)
}

fn referenced_table(src: &str, tokens: &[Token]) -> Option<String> {
    let mut name = None;
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        name = Some(word_text(token, src)?);
        if !iter.peek().is_some_and(|t| matches!(t.kind, TokenKind::Dot)) {
            break;
        }
        iter.next();
    }
    name
}

/// Parses one column definition such as `email varchar(120) NOT NULL`.
///
/// # Errors
///
/// Returns a `ParseError` when the text has no name or no type.
pub fn parse_column_definition(definition: &str) -> Result<ColumnDecl, ParseError> {
    let mut tokens = Lexer::new(definition).tokenize();
    tokens.retain(|t| !matches!(t.kind, TokenKind::Eof | TokenKind::Semicolon));
    column_from_tokens(definition, &tokens)
}

/// The `DEFAULT` expression of a column definition, if any.
#[must_use]
pub fn extract_default(definition: &str) -> Option<String> {
    parse_column_definition(definition).ok()?.default
}

/// Matches `CREATE TABLE name PARTITION OF parent ...`.
///
/// # Errors
///
/// Returns a `ParseError` for any other statement shape.
pub fn parse_partition_of(sql: &str) -> Result<PartitionOf, ParseError> {
    let mut cursor = Cursor::new(sql);
    let (name, _) = create_table_head(&mut cursor)?;
    cursor.expect_keyword(Keyword::Partition)?;
    cursor.expect_keyword(Keyword::Of)?;
    let parent = cursor.expect_object_name()?;
    Ok(PartitionOf { name, parent })
}
