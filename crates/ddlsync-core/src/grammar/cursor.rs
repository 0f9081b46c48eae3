//! Token cursor shared by the statement matchers.

use std::ops::Range;

use super::error::ParseError;
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};

/// Folds an identifier the way PostgreSQL does: unquoted names are
/// lower-cased, quoted names are kept verbatim.
pub fn word_text(token: &Token, src: &str) -> Option<String> {
    match &token.kind {
        TokenKind::Identifier(name) => Some(name.to_lowercase()),
        TokenKind::QuotedIdentifier(name) => Some(name.clone()),
        TokenKind::Keyword(_) => Some(token.span.text(src).to_lowercase()),
        _ => None,
    }
}

/// Splits `tokens` at commas outside parentheses and brackets.
pub fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
            TokenKind::RightParen | TokenKind::RightBracket => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts
}

/// Span covering a non-empty token slice.
pub fn span_of(tokens: &[Token]) -> Option<Span> {
    let first = tokens.first()?;
    let last = tokens.last()?;
    Some(first.span.merge(last.span))
}

/// Recursive-descent helper over one tokenized statement.
pub struct Cursor<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            tokens: Lexer::new(src).tokenize(),
            pos: 0,
        }
    }

    pub const fn src(&self) -> &'a str {
        self.src
    }

    /// The current token. Past the end this is the trailing `Eof`.
    pub fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    /// The token `n` positions ahead.
    pub fn peek_at(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    pub fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn tokens(&self, range: Range<usize>) -> &[Token] {
        &self.tokens[range]
    }

    /// Checks if the current token matches the given kind.
    pub fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().as_keyword() == Some(keyword)
    }

    /// Consumes the keyword if present.
    pub fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        let found = self.check_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    /// Consumes a token of the given kind if present.
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        let found = self.check(kind);
        if found {
            self.advance();
        }
        found
    }

    /// Consumes an unquoted identifier spelled `word` (case-insensitive).
    pub fn eat_word(&mut self, word: &str) -> bool {
        let found = matches!(&self.current().kind, TokenKind::Identifier(w) if w.eq_ignore_ascii_case(word));
        if found {
            self.advance();
        }
        found
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::unexpected(expected, self.current().kind.clone(), self.current().span)
    }

    /// Expects the current token to be the given kind.
    pub fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(format!("{kind:?}")))
        }
    }

    /// Expects the current token to be the given keyword.
    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword.as_str()))
        }
    }

    /// Expects any word (identifier, quoted identifier or keyword) and
    /// returns its folded text.
    pub fn expect_name(&mut self) -> Result<String, ParseError> {
        match word_text(self.current(), self.src) {
            Some(name) => {
                self.advance();
                Ok(name)
            }
            None => Err(self.unexpected("name")),
        }
    }

    /// Expects `a[.b[.c]]` and returns every part.
    pub fn expect_qualified_parts(&mut self) -> Result<Vec<String>, ParseError> {
        let mut parts = vec![self.expect_name()?];
        while self.eat(&TokenKind::Dot) {
            parts.push(self.expect_name()?);
        }
        Ok(parts)
    }

    /// Expects a possibly schema-qualified name and returns the last part.
    pub fn expect_object_name(&mut self) -> Result<String, ParseError> {
        let mut parts = self.expect_qualified_parts()?;
        parts
            .pop()
            .ok_or_else(|| self.unexpected("name"))
    }

    /// Expects `IF NOT EXISTS` when present. Returns whether it was there.
    pub fn eat_if_not_exists(&mut self) -> Result<bool, ParseError> {
        if !self.eat_keyword(Keyword::If) {
            return Ok(false);
        }
        self.expect_keyword(Keyword::Not)?;
        self.expect_keyword(Keyword::Exists)?;
        Ok(true)
    }

    /// Consumes `( ... )` and returns the token range of each top-level
    /// comma-separated element.
    pub fn parenthesized(&mut self) -> Result<Vec<Range<usize>>, ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut elements = Vec::new();
        let mut depth = 0usize;
        let mut start = self.pos;
        loop {
            match self.current().kind {
                TokenKind::LeftParen | TokenKind::LeftBracket => depth += 1,
                TokenKind::RightBracket => depth = depth.saturating_sub(1),
                TokenKind::RightParen if depth == 0 => {
                    if start < self.pos {
                        elements.push(start..self.pos);
                    }
                    self.advance();
                    return Ok(elements);
                }
                TokenKind::RightParen => depth -= 1,
                TokenKind::Comma if depth == 0 => {
                    elements.push(start..self.pos);
                    start = self.pos + 1;
                }
                TokenKind::Eof => return Err(self.unexpected("')'")),
                _ => {}
            }
            self.advance();
        }
    }

    /// Parses `( name, name, ... )`.
    pub fn name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let ranges = self.parenthesized()?;
        ranges
            .into_iter()
            .map(|range| {
                let tokens = self.tokens(range);
                match tokens {
                    [single] => word_text(single, self.src)
                        .ok_or_else(|| ParseError::new("expected column name", single.span)),
                    _ => Err(ParseError::new(
                        "expected a single column name",
                        span_of(tokens).unwrap_or_default(),
                    )),
                }
            })
            .collect()
    }

    /// True at end of statement (optionally after a trailing `;`).
    pub fn at_end(&self) -> bool {
        match self.current().kind {
            TokenKind::Eof => true,
            TokenKind::Semicolon => self.peek_at(1).is_eof(),
            _ => false,
        }
    }

    pub fn expect_end(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of statement"))
        }
    }

    /// Source text from the current token to the end of the statement,
    /// without a trailing `;`.
    pub fn rest_text(&self) -> &'a str {
        let start = self.current().span.start;
        let end = self
            .tokens
            .iter()
            .rev()
            .find(|t| !matches!(t.kind, TokenKind::Eof | TokenKind::Semicolon))
            .map_or(start, |t| t.span.end);
        self.src.get(start..end.max(start)).unwrap_or_default().trim()
    }

    /// Skips to the end of the statement.
    pub fn skip_rest(&mut self) {
        self.pos = self.tokens.len() - 1;
    }
}
