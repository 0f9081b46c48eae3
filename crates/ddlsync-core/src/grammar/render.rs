//! Canonical re-spacing of token runs.
//!
//! Declared DDL and catalog output (`pg_indexes.indexdef`) format the same
//! expression differently; both go through [`render`] so the comparison
//! sees one spelling.

use crate::lexer::{Token, TokenKind};

/// Joins tokens with canonical spacing: none inside brackets, none before
/// `,`, none between a name and its `(`, one space everywhere else
/// (including around `::`).
#[must_use]
pub fn render(src: &str, tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut prev: Option<&Token> = None;
    for token in tokens {
        if prev.is_some_and(|p| needs_space(p, token)) {
            out.push(' ');
        }
        out.push_str(token.span.text(src));
        prev = Some(token);
    }
    out
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    match (&prev.kind, &next.kind) {
        (TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::Dot, _)
        | (
            _,
            TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::LeftBracket
            | TokenKind::Comma
            | TokenKind::Dot,
        ) => false,
        (_, TokenKind::LeftParen) => !prev.is_word(),
        _ => true,
    }
}

/// Drops parentheses that wrap the whole run, e.g. `((lower(x)))`.
#[must_use]
pub fn unwrap_parens(mut tokens: &[Token]) -> &[Token] {
    while tokens.len() >= 2
        && matches!(tokens[0].kind, TokenKind::LeftParen)
        && matching_close(tokens) == Some(tokens.len() - 1)
    {
        tokens = &tokens[1..tokens.len() - 1];
    }
    tokens
}

fn matching_close(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen => depth += 1,
            TokenKind::RightParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
