//! DDL lexer.
//!
//! A hand-written PostgreSQL lexer producing tokens with byte spans, so the
//! grammar matcher can slice the original text back out of a match.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
