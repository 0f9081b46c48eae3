//! DDL statement matchers.
//!
//! Each matcher recognizes one statement shape and extracts the parts the
//! reconciler needs. The `parse_*` functions report why a statement did
//! not match; the `match_*` wrappers only answer whether it did, which is
//! what handler dispatch wants.
//!
//! ```rust
//! use ddlsync_core::grammar::{match_create_index, match_create_table};
//!
//! let table = match_create_table("CREATE TABLE users (id serial PRIMARY KEY, email text)").unwrap();
//! assert_eq!(table.name, "users");
//! assert_eq!(table.columns.len(), 2);
//!
//! let index = match_create_index("CREATE INDEX users_email ON users (lower(email))").unwrap();
//! assert_eq!(index.columns, vec!["email"]);
//! assert!(match_create_index("CREATE TABLE t (a int)").is_none());
//! ```

mod cursor;
mod error;
mod index;
mod objects;
mod render;
mod routine;
mod split;
mod table;

pub use error::ParseError;
pub use index::parse_index;
pub use objects::{
    parse_comment, parse_create_type, parse_create_view, parse_materialized_view, Comment,
    CommentTarget, CreateType, CreateView,
};
pub use render::{render, unwrap_parens};
pub use routine::routine_headers;
pub use split::{split_statements, Fragment};
pub use table::{
    extract_default, parse_column_definition, parse_create_table, parse_partition_of, ColumnDecl,
    CreateTable, PartitionOf,
};

use crate::lexer::TokenKind;
use crate::schema::Index;

#[must_use]
pub fn match_create_table(sql: &str) -> Option<CreateTable> {
    parse_create_table(sql).ok()
}

#[must_use]
pub fn match_partition_of(sql: &str) -> Option<PartitionOf> {
    parse_partition_of(sql).ok()
}

#[must_use]
pub fn match_create_view(sql: &str) -> Option<CreateView> {
    parse_create_view(sql).ok()
}

#[must_use]
pub fn match_materialized_view(sql: &str) -> Option<String> {
    parse_materialized_view(sql).ok()
}

/// Matches `CREATE INDEX` and index-backed `ADD CONSTRAINT` statements.
#[must_use]
pub fn match_create_index(sql: &str) -> Option<Index> {
    parse_index(sql).ok()
}

#[must_use]
pub fn match_comment(sql: &str) -> Option<Comment> {
    parse_comment(sql).ok()
}

#[must_use]
pub fn match_create_type(sql: &str) -> Option<CreateType> {
    parse_create_type(sql).ok()
}

/// True when the statement starts with the given words, compared
/// case-insensitively and ignoring leading comments.
#[must_use]
pub fn starts_with_words(sql: &str, words: &[&str]) -> bool {
    let tokens = crate::lexer::Lexer::new(sql).tokenize();
    words.len() <= tokens.len()
        && words.iter().zip(&tokens).all(|(word, token)| {
            cursor::word_text(token, sql).is_some_and(|text| text.eq_ignore_ascii_case(word))
        })
}

/// True when the words appear consecutively anywhere in the statement.
/// Words inside string literals, quoted bodies and comments never match.
#[must_use]
pub fn contains_words(sql: &str, words: &[&str]) -> bool {
    let tokens = crate::lexer::Lexer::new(sql).tokenize();
    !words.is_empty()
        && tokens.windows(words.len()).any(|window| {
            words.iter().zip(window).all(|(word, token)| {
                cursor::word_text(token, sql).is_some_and(|text| text.eq_ignore_ascii_case(word))
            })
        })
}

/// Byte offset of `word` outside any parentheses, e.g. the `RETURNING`
/// of an insert but not one inside a subquery.
#[must_use]
pub fn find_top_level_word(sql: &str, word: &str) -> Option<usize> {
    let tokens = crate::lexer::Lexer::new(sql).tokenize();
    let mut depth = 0usize;
    for token in &tokens {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => depth = depth.saturating_sub(1),
            _ if depth == 0
                && cursor::word_text(token, sql).is_some_and(|text| text.eq_ignore_ascii_case(word)) =>
            {
                return Some(token.span.start);
            }
            _ => {}
        }
    }
    None
}
