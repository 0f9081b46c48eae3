//! Matcher error type.

use thiserror::Error;

use crate::lexer::{Span, TokenKind};

/// Why a statement did not match a grammar rule.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {}..{}", .span.start, .span.end)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// The actual token found.
    pub found: Option<TokenKind>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected token" error.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        let expected: String = expected.into();
        let message = if matches!(found, TokenKind::Eof) {
            format!("Unexpected end of input: expected {expected}")
        } else {
            format!("Unexpected token: expected {expected}, found {found:?}")
        };
        Self {
            message,
            span,
            expected: Some(expected),
            found: Some(found),
        }
    }
}
