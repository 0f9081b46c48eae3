//! Statement splitting.

use serde::Serialize;

use crate::lexer::{Lexer, Span, TokenKind};

/// One statement of a DDL file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    /// Statement text without the trailing `;`.
    pub text: String,
    /// 1-based line the statement starts on.
    pub line: usize,
}

/// Splits `source` at top-level semicolons. Semicolons inside strings,
/// dollar-quoted bodies and comments do not split; fragments holding
/// only comments are dropped.
#[must_use]
pub fn split_statements(source: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut current: Option<Span> = None;
    for token in Lexer::new(source).tokenize() {
        match token.kind {
            TokenKind::Semicolon | TokenKind::Eof => {
                if let Some(span) = current.take() {
                    fragments.push(Fragment {
                        text: span.text(source).to_string(),
                        line: span.line(source),
                    });
                }
            }
            _ => {
                current = Some(current.map_or(token.span, |span| span.merge(token.span)));
            }
        }
    }
    fragments
}
