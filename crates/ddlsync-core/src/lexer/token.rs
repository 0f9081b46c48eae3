//! Token types for the DDL lexer.

use super::Span;

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// Words the DDL matcher recognizes structurally.
        ///
        /// Any keyword may still appear as a table or column name; the
        /// matcher decides from position.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// Attempts to parse a keyword from a string (case-insensitive).
            #[must_use]
            #[allow(clippy::should_implement_trait)]
            pub fn from_str(s: &str) -> Option<Self> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Returns the upper-case SQL spelling.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)*
                }
            }
        }
    };
}

keywords! {
    Action => "ACTION",
    Add => "ADD",
    Alter => "ALTER",
    Array => "ARRAY",
    As => "AS",
    Asc => "ASC",
    Cascade => "CASCADE",
    Check => "CHECK",
    Collate => "COLLATE",
    Column => "COLUMN",
    Comment => "COMMENT",
    Concurrently => "CONCURRENTLY",
    Constraint => "CONSTRAINT",
    Create => "CREATE",
    Default => "DEFAULT",
    Deferrable => "DEFERRABLE",
    Delete => "DELETE",
    Desc => "DESC",
    Drop => "DROP",
    Enum => "ENUM",
    Exclude => "EXCLUDE",
    Exists => "EXISTS",
    Extension => "EXTENSION",
    First => "FIRST",
    Foreign => "FOREIGN",
    Function => "FUNCTION",
    Generated => "GENERATED",
    Global => "GLOBAL",
    Grant => "GRANT",
    If => "IF",
    Include => "INCLUDE",
    Index => "INDEX",
    Initially => "INITIALLY",
    Insert => "INSERT",
    Is => "IS",
    Key => "KEY",
    Last => "LAST",
    Like => "LIKE",
    Local => "LOCAL",
    Match => "MATCH",
    Materialized => "MATERIALIZED",
    No => "NO",
    Not => "NOT",
    Null => "NULL",
    Nulls => "NULLS",
    Of => "OF",
    On => "ON",
    Only => "ONLY",
    Or => "OR",
    Partition => "PARTITION",
    Primary => "PRIMARY",
    Procedure => "PROCEDURE",
    Recursive => "RECURSIVE",
    References => "REFERENCES",
    Replace => "REPLACE",
    Restrict => "RESTRICT",
    Revoke => "REVOKE",
    Set => "SET",
    Table => "TABLE",
    Temp => "TEMP",
    Temporary => "TEMPORARY",
    Type => "TYPE",
    Unique => "UNIQUE",
    Unlogged => "UNLOGGED",
    Update => "UPDATE",
    Using => "USING",
    View => "VIEW",
    Where => "WHERE",
    With => "WITH",
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal (e.g., 42)
    Integer(i64),
    /// Float literal (e.g., 3.14)
    Float(f64),
    /// String literal with quotes removed and `''` unescaped
    String(String),
    /// Dollar-quoted body (`$$ ... $$` or `$tag$ ... $tag$`), tags removed
    DollarString(String),
    /// Positional parameter (`$1`)
    Param(u32),

    // Identifiers and keywords
    /// Unquoted identifier, case preserved
    Identifier(String),
    /// `"Quoted"` identifier, never case-folded
    QuotedIdentifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,
    /// ~
    Tilde,
    /// ^
    Caret,
    /// Any other operator run (`->>`, `@>`, `&&`, ...)
    Operator(String),

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// [
    LeftBracket,
    /// ]
    RightBracket,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :
    Colon,
    /// ::
    DoubleColon,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// True for tokens that can name something: identifiers, quoted
    /// identifiers and keywords.
    #[must_use]
    pub const fn is_word(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_) | TokenKind::Keyword(_)
        )
    }

    /// True for literal values (numbers and strings).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::String(_)
                | TokenKind::DollarString(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Keyword::from_str("CREATE"), Some(Keyword::Create));
        assert_eq!(Keyword::from_str("create"), Some(Keyword::Create));
        assert_eq!(Keyword::from_str("MaTeRiAlIzEd"), Some(Keyword::Materialized));
        assert_eq!(Keyword::from_str("opendate"), None);
    }

    #[test]
    fn test_keyword_as_str() {
        assert_eq!(Keyword::Concurrently.as_str(), "CONCURRENTLY");
        assert_eq!(Keyword::References.as_str(), "REFERENCES");
    }

    #[test]
    fn test_token_predicates() {
        let eof = Token::new(TokenKind::Eof, Span::new(0, 0));
        let table = Token::new(TokenKind::Keyword(Keyword::Table), Span::new(0, 5));
        let quoted = Token::new(TokenKind::QuotedIdentifier("Users".into()), Span::new(0, 7));
        let text = Token::new(TokenKind::String("x".into()), Span::new(0, 3));

        assert!(eof.is_eof());
        assert_eq!(table.as_keyword(), Some(Keyword::Table));
        assert!(table.is_word());
        assert!(quoted.is_word());
        assert!(!text.is_word());
        assert!(text.is_literal());
    }
}
