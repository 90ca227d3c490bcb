//! The token definition for the DSQL language.

use std::borrow::Cow;
use std::fmt;

use crate::expression::ComparisonOperator;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// The exact source text of the token.
    pub lexeme: &'a str,
    pub span: Span,
    /// Line and column where the token starts.
    pub position: Position,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    Select, // "SELECT"
    From,   // "FROM"
    Where,  // "WHERE"
    Order,  // "ORDER"
    By,     // "BY"
    Asc,    // "ASC" | "ASCENDING"
    Desc,   // "DESC" | "DESCENDING"
    Limit,  // "LIMIT"
    Offset, // "OFFSET"
    And,    // "AND"
    Or,     // "OR"
    Not,    // "NOT"
    Null,   // "NULL"

    // Literals
    /// A bare identifier, or the content of a `[...]` bracketed identifier.
    Identifier(&'a str),
    /// The unescaped content of a quoted string.
    String(Cow<'a, str>),
    Integer(&'a str),
    /// Digits and dots. `1.2.3` is tokenized as-is.
    Double(&'a str),
    Boolean(bool),
    Date(&'a str),
    DateTime(&'a str),
    /// A whole `#[...]` block, delimiters included.
    Embedded(&'a str),

    // Comparison
    Operator(ComparisonOperator), // = > < <= <> >=
    Like,                         // "LIKE"

    // Punctuation
    Comma,  // ,
    LParen, // (
    RParen, // )
    Star,   // *

    Eof,
}

impl TokenKind<'_> {
    /// Returns the comparison operator this token denotes, covering both
    /// the symbolic operators and the `LIKE` comparator.
    pub fn comparison_operator(&self) -> Option<ComparisonOperator> {
        match self {
            TokenKind::Operator(op) => Some(*op),
            TokenKind::Like => Some(ComparisonOperator::Like),
            _ => None,
        }
    }

    /// A short human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Identifier(name) => format!("identifier `{name}`"),
            TokenKind::String(s) => format!("string literal \"{s}\""),
            TokenKind::Integer(n) | TokenKind::Double(n) => format!("number `{n}`"),
            TokenKind::Boolean(b) => format!("boolean `{b}`"),
            TokenKind::Date(d) => format!("date `{d}`"),
            TokenKind::DateTime(d) => format!("date-time `{d}`"),
            TokenKind::Embedded(e) => format!("embedded expression `{e}`"),
            TokenKind::Operator(op) => format!("operator `{op}`"),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("`{}`", other.keyword_text()),
        }
    }

    fn keyword_text(&self) -> &'static str {
        match self {
            TokenKind::Select => "SELECT",
            TokenKind::From => "FROM",
            TokenKind::Where => "WHERE",
            TokenKind::Order => "ORDER",
            TokenKind::By => "BY",
            TokenKind::Asc => "ASC",
            TokenKind::Desc => "DESC",
            TokenKind::Limit => "LIMIT",
            TokenKind::Offset => "OFFSET",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Null => "NULL",
            TokenKind::Like => "LIKE",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Star => "*",
            _ => "?",
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A location in the source text, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self { offset, line, column }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
