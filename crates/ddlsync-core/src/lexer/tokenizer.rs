//! PostgreSQL-flavoured tokenizer.

use super::{Keyword, Span, Token, TokenKind};

/// Characters that may start an operator run the lexer does not name.
const OPERATOR_START: &[char] = &['@', '#', '&', '!', '?', '^', '~'];
/// Characters that may continue an operator run.
const OPERATOR_CONTINUE: &[char] = &['@', '#', '&', '!', '?', '^', '~', '|', '<', '>', '=', '*', '-'];

/// A lexer that tokenizes DDL input.
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            // Block comments nest in PostgreSQL.
            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                let mut depth = 1usize;
                while depth > 0 {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            depth -= 1;
                        }
                        Some('/') if self.peek() == Some('*') => {
                            self.advance();
                            depth += 1;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    fn scan_quoted_identifier(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('"') if self.peek() == Some('"') => {
                    self.advance();
                    value.push('"');
                }
                Some('"') => break,
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(
                        "Unterminated quoted identifier".to_string(),
                    ));
                }
            }
        }

        self.make_token(TokenKind::QuotedIdentifier(value))
    }

    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E')
            && self
                .peek_next()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_float {
            match text.parse::<f64>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid float: {e}"))),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid integer: {e}"))),
            }
        }
    }

    /// Scans `'...'`. With `backslash_escapes` (an `E'...'` literal) a
    /// backslash escapes the next character.
    fn scan_string(&mut self, backslash_escapes: bool) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                    value.push('\'');
                }
                Some('\'') => break,
                Some('\\') if backslash_escapes => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => break,
                },
                Some(c) => value.push(c),
                None => {
                    return self
                        .make_token(TokenKind::Error("Unterminated string literal".to_string()));
                }
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans after a `$`: either a positional parameter or a dollar-quoted
    /// string.
    fn scan_dollar(&mut self) -> Token {
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            let digits = &self.input[self.start + 1..self.pos];
            return match digits.parse::<u32>() {
                Ok(n) => self.make_token(TokenKind::Param(n)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid parameter: {e}"))),
            };
        }

        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        if self.peek() != Some('$') {
            return self.make_token(TokenKind::Error("Unexpected character: $".to_string()));
        }
        self.advance();

        let tag = &self.input[self.start..self.pos];
        let body_start = self.pos;
        match self.input[body_start..].find(tag) {
            Some(offset) => {
                let body = self.input[body_start..body_start + offset].to_string();
                self.pos = body_start + offset + tag.len();
                self.make_token(TokenKind::DollarString(body))
            }
            None => {
                self.pos = self.input.len();
                self.make_token(TokenKind::Error(format!("Unterminated {tag} string")))
            }
        }
    }

    fn scan_operator(&mut self) -> Token {
        while self.peek().is_some_and(|c| OPERATOR_CONTINUE.contains(&c))
            && !(self.peek() == Some('-') && self.peek_next() == Some('-'))
        {
            self.advance();
        }
        let kind = match &self.input[self.start..self.pos] {
            "~" => TokenKind::Tilde,
            "^" => TokenKind::Caret,
            "!=" => TokenKind::NotEq,
            other => TokenKind::Operator(other.to_string()),
        };
        self.make_token(kind)
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '\'' => return self.scan_string(false),
            '"' => return self.scan_quoted_identifier(),
            'E' | 'e' if self.peek_next() == Some('\'') => {
                self.advance();
                return self.scan_string(true);
            }
            c if c.is_ascii_digit() => return self.scan_number(),
            c if c.is_alphabetic() || c == '_' => return self.scan_identifier(),
            c if OPERATOR_START.contains(&c) => return self.scan_operator(),
            _ => {}
        }

        self.advance();
        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '=' => self.make_token(TokenKind::Eq),
            '$' => self.scan_dollar(),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.pos = self.start;
                self.scan_number_after_dot()
            }
            '.' => self.make_token(TokenKind::Dot),
            '-' => {
                if self.peek() == Some('>') {
                    self.scan_operator()
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            ':' => {
                if self.peek() == Some(':') {
                    self.advance();
                    self.make_token(TokenKind::DoubleColon)
                } else {
                    self.make_token(TokenKind::Colon)
                }
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                }
                Some('<' | '@') => self.scan_operator(),
                _ => self.make_token(TokenKind::Lt),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                }
                Some('>') => self.scan_operator(),
                _ => self.make_token(TokenKind::Gt),
            },
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::Concat)
                } else {
                    self.scan_operator()
                }
            }
            other => self.make_token(TokenKind::Error(format!("Unexpected character: {other}"))),
        }
    }

    /// Scans `.5` style numbers.
    fn scan_number_after_dot(&mut self) -> Token {
        self.advance();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let text = &self.input[self.start..self.pos];
        match text.parse::<f64>() {
            Ok(f) => self.make_token(TokenKind::Float(f)),
            Err(e) => self.make_token(TokenKind::Error(format!("Invalid float: {e}"))),
        }
    }

    /// Tokenizes the entire input. The last token is always `Eof`.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
