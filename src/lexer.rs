//! The DSQL lexer.
//!
//! Tokens are produced lazily through the [`Iterator`] impl. Whitespace and
//! `--` line comments are skipped. The last token of a successful scan is
//! always [`TokenKind::Eof`]; after that, or after the first error, the lexer
//! yields `None`.
//!
//! Words are matched longest-first. At a word start the lexer measures every
//! candidate (date-time, date, number, identifier/keyword) and keeps the
//! longest. On a tie the earlier candidate in that list wins, so `2024-01-31`
//! is a date and `12` is an integer rather than an identifier.

use std::borrow::Cow;

use thiserror::Error;
use tracing::trace;

use crate::expression::ComparisonOperator;
use crate::token::{Position, Span, Token, TokenKind};

/// Raised on characters or constructs the lexer cannot tokenize.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl LexError {
    fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
    line: usize,
    column: usize,
    finished: bool,
}

/// Starts tokenizing `input`. A lexer cannot be restarted; create a new one per input.
pub fn tokenize(input: &str) -> Lexer<'_> {
    Lexer::new(input)
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Starts scanning at byte `offset` of `input`, skipping a single-line
    /// ASCII prefix. Positions stay relative to the whole input.
    pub fn starting_at(input: &'a str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let column = 1 + input[..offset].chars().count();
        Lexer {
            input,
            position: offset,
            line: 1,
            column,
            finished: false,
        }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn current_position(&self) -> Position {
        Position::new(self.position, self.line, self.column)
    }

    /// Skips whitespace and `--` comments.
    fn skip_trivia(&mut self) {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.bump();
                } else {
                    break;
                }
            }
            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: Position) -> Token<'a> {
        Token {
            kind,
            lexeme: &self.input[start.offset..self.position],
            span: Span::new(start.offset, self.position),
            position: start,
        }
    }

    /// Consumes one character and builds a token of the given kind.
    fn single(&mut self, kind: TokenKind<'a>, start: Position) -> Token<'a> {
        self.bump();
        self.token(kind, start)
    }

    /// 读取引号包围的字符串字面量, 支持转义
    fn read_string(&mut self, quote: char, start: Position) -> Result<Token<'a>, LexError> {
        let input = self.input;
        self.bump(); // 消费开始引号
        let content_start = self.position;
        // Only allocated once an escape sequence shows up.
        let mut unescaped: Option<String> = None;

        loop {
            let Some(c) = self.peek() else {
                return Err(LexError::new("unterminated string literal", start));
            };
            match c {
                c if c == quote => {
                    let content_end = self.position;
                    self.bump(); // 消费结束引号
                    let value = match unescaped {
                        Some(s) => Cow::Owned(s),
                        None => Cow::Borrowed(&input[content_start..content_end]),
                    };
                    return Ok(self.token(TokenKind::String(value), start));
                }
                '\\' => {
                    let buf = unescaped
                        .get_or_insert_with(|| input[content_start..self.position].to_string());
                    let escape_start = self.current_position();
                    self.bump();
                    buf.push(self.read_escape(escape_start, start)?);
                }
                other => {
                    if let Some(buf) = unescaped.as_mut() {
                        buf.push(other);
                    }
                    self.bump();
                }
            }
        }
    }

    /// Reads the character after a backslash. The backslash is already consumed.
    fn read_escape(&mut self, escape_start: Position, string_start: Position) -> Result<char, LexError> {
        let Some(c) = self.bump() else {
            return Err(LexError::new("unterminated string literal", string_start));
        };
        let escaped = match c {
            'b' => '\u{0008}',
            't' => '\t',
            'n' => '\n',
            'f' => '\u{000C}',
            'r' => '\r',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            'u' => {
                let digits_start = self.position;
                for _ in 0..4 {
                    match self.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            self.bump();
                        }
                        _ => {
                            return Err(LexError::new(
                                "unicode escape needs exactly four hex digits",
                                escape_start,
                            ));
                        }
                    }
                }
                let digits = &self.input[digits_start..self.position];
                u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        LexError::new(format!("invalid unicode escape \\u{digits}"), escape_start)
                    })?
            }
            other => {
                return Err(LexError::new(
                    format!("invalid escape sequence '\\{other}'"),
                    escape_start,
                ));
            }
        };
        Ok(escaped)
    }

    /// 读取 `#[...]` 内嵌表达式
    ///
    /// Nested brackets are balanced with a depth counter; brackets inside a
    /// quoted string do not count.
    fn read_embedded(&mut self, start: Position) -> Result<Token<'a>, LexError> {
        self.bump(); // '#'
        self.bump(); // '['
        let mut depth = 1usize;

        while depth > 0 {
            let Some(c) = self.bump() else {
                return Err(LexError::new("unbalanced brackets in embedded expression", start));
            };
            match c {
                '[' => depth += 1,
                ']' => depth -= 1,
                '\'' | '"' => self.skip_quoted(c, start)?,
                _ => {}
            }
        }

        let raw = &self.input[start.offset..self.position];
        Ok(self.token(TokenKind::Embedded(raw), start))
    }

    /// Skips a quoted string inside an embedded expression. The opening quote is consumed.
    fn skip_quoted(&mut self, quote: char, start: Position) -> Result<(), LexError> {
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
                None => {
                    return Err(LexError::new(
                        "unterminated string inside embedded expression",
                        start,
                    ));
                }
            }
        }
    }

    /// 读取 `[...]` 形式的标识符
    fn read_bracketed_identifier(&mut self, start: Position) -> Result<Token<'a>, LexError> {
        self.bump(); // '['
        let content_start = self.position;
        loop {
            match self.peek() {
                Some(']') => break,
                Some('\n') | None => {
                    return Err(LexError::new("unterminated bracketed identifier", start));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let content = &self.input[content_start..self.position];
        self.bump(); // ']'
        if content.is_empty() {
            return Err(LexError::new("empty bracketed identifier", start));
        }
        Ok(self.token(TokenKind::Identifier(content), start))
    }

    /// 读取标识符、关键字、数字或日期
    fn read_word(&mut self, start: Position) -> Token<'a> {
        let rest = &self.input[self.position..];

        let word_len = rest.bytes().take_while(|b| is_word_byte(*b)).count();
        let number_len = match rest.bytes().take_while(|b| b.is_ascii_digit() || *b == b'.').count() {
            n if rest[..n].bytes().any(|b| b.is_ascii_digit()) => n,
            _ => 0,
        };
        let candidates = [
            (match_datetime(rest).unwrap_or(0), WordKind::DateTime),
            (match_date(rest).unwrap_or(0), WordKind::Date),
            (number_len, WordKind::Number),
            (word_len, WordKind::Word),
        ];

        // Longest wins; ties keep the earlier candidate.
        let mut best = (0, WordKind::Word);
        for candidate in candidates {
            if candidate.0 > best.0 {
                best = candidate;
            }
        }
        let (len, word_kind) = best;

        // Every candidate is ASCII, so one char per byte.
        for _ in 0..len {
            self.bump();
        }
        let text = &self.input[start.offset..self.position];

        let kind = match word_kind {
            WordKind::DateTime => TokenKind::DateTime(text),
            WordKind::Date => TokenKind::Date(text),
            WordKind::Number if text.contains('.') => TokenKind::Double(text),
            WordKind::Number => TokenKind::Integer(text),
            WordKind::Word => match_keyword(text),
        };
        self.token(kind, start)
    }
}

#[derive(Debug, Clone, Copy)]
enum WordKind {
    DateTime,
    Date,
    Number,
    Word,
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-')
}

fn is_word_start(c: char) -> bool {
    c.is_ascii() && is_word_byte(c as u8)
}

fn match_keyword(s: &str) -> TokenKind<'_> {
    match s.to_ascii_uppercase().as_str() {
        "SELECT" => TokenKind::Select,
        "FROM" => TokenKind::From,
        "WHERE" => TokenKind::Where,
        "ORDER" => TokenKind::Order,
        "BY" => TokenKind::By,
        "ASC" | "ASCENDING" => TokenKind::Asc,
        "DESC" | "DESCENDING" => TokenKind::Desc,
        "LIMIT" => TokenKind::Limit,
        "OFFSET" => TokenKind::Offset,
        "AND" => TokenKind::And,
        "OR" => TokenKind::Or,
        "NOT" => TokenKind::Not,
        "NULL" => TokenKind::Null,
        "LIKE" => TokenKind::Like,
        "TRUE" => TokenKind::Boolean(true),
        "FALSE" => TokenKind::Boolean(false),
        _ => TokenKind::Identifier(s),
    }
}

/// Checks that `s` starts with a byte pattern where `d` is a digit and any
/// other byte must match literally. Returns the pattern length.
fn match_pattern(s: &[u8], pattern: &[u8]) -> Option<usize> {
    if s.len() < pattern.len() {
        return None;
    }
    let ok = pattern.iter().zip(s).all(|(p, b)| match p {
        b'd' => b.is_ascii_digit(),
        _ => p == b,
    });
    ok.then_some(pattern.len())
}

/// `YYYY-MM-DD`
fn match_date(s: &str) -> Option<usize> {
    match_pattern(s.as_bytes(), b"dddd-dd-dd")
}

/// `YYYY-MM-DDTHH:MM:SS(.f+)?` followed by `Z` or `±HH:MM`.
fn match_datetime(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut len = match_pattern(bytes, b"dddd-dd-ddTdd:dd:dd")?;

    if bytes.get(len) == Some(&b'.') {
        let fraction = bytes[len + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if fraction == 0 {
            return None;
        }
        len += 1 + fraction;
    }

    match bytes.get(len) {
        Some(b'Z') => Some(len + 1),
        Some(b'+') | Some(b'-') => {
            match_pattern(&bytes[len + 1..], b"dd:dd").map(|tz| len + 1 + tz)
        }
        _ => None,
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.skip_trivia();
        let start = self.current_position();

        let Some(c) = self.peek() else {
            self.finished = true;
            return Some(Ok(self.token(TokenKind::Eof, start)));
        };

        let result = match c {
            ',' => Ok(self.single(TokenKind::Comma, start)),
            '(' => Ok(self.single(TokenKind::LParen, start)),
            ')' => Ok(self.single(TokenKind::RParen, start)),
            '*' => Ok(self.single(TokenKind::Star, start)),
            '=' => Ok(self.single(TokenKind::Operator(ComparisonOperator::Eq), start)),
            '<' => {
                self.bump();
                let op = match self.peek() {
                    Some('=') => {
                        self.bump();
                        ComparisonOperator::Lte
                    }
                    Some('>') => {
                        self.bump();
                        ComparisonOperator::NotEq
                    }
                    _ => ComparisonOperator::Lt,
                };
                Ok(self.token(TokenKind::Operator(op), start))
            }
            '>' => {
                self.bump();
                let op = if self.peek() == Some('=') {
                    self.bump();
                    ComparisonOperator::Gte
                } else {
                    ComparisonOperator::Gt
                };
                Ok(self.token(TokenKind::Operator(op), start))
            }
            '\'' | '"' => self.read_string(c, start),
            '#' if self.peek_next() == Some('[') => self.read_embedded(start),
            '[' => self.read_bracketed_identifier(start),
            c if is_word_start(c) => Ok(self.read_word(start)),
            other => Err(LexError::new(format!("illegal character '{other}'"), start)),
        };

        match &result {
            Ok(token) => trace!(kind = ?token.kind, lexeme = token.lexeme, "token"),
            Err(_) => self.finished = true,
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        Lexer::new(input).map(|t| t.unwrap().kind).collect()
    }

    fn first_error(input: &str) -> LexError {
        Lexer::new(input)
            .find_map(Result::err)
            .expect("expected a lexical error")
    }

    #[test]
    fn test_simple_select() {
        let input = "SELECT * FROM Account";
        let mut lexer = Lexer::new(input);

        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Select);
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Star);
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::From);
        assert_eq!(
            lexer.next().unwrap().unwrap().kind,
            TokenKind::Identifier("Account")
        );
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        let input = "= > < <= <> >= , ( ) * LIKE";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Operator(ComparisonOperator::Eq),
                TokenKind::Operator(ComparisonOperator::Gt),
                TokenKind::Operator(ComparisonOperator::Lt),
                TokenKind::Operator(ComparisonOperator::Lte),
                TokenKind::Operator(ComparisonOperator::NotEq),
                TokenKind::Operator(ComparisonOperator::Gte),
                TokenKind::Comma,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Star,
                TokenKind::Like,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let input = "select From wHeRe order BY limit OFFSET and Or not null";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Select,
                TokenKind::From,
                TokenKind::Where,
                TokenKind::Order,
                TokenKind::By,
                TokenKind::Limit,
                TokenKind::Offset,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::Null,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_long_direction_keywords() {
        assert_eq!(
            kinds("asc ASCENDING desc Descending"),
            vec![
                TokenKind::Asc,
                TokenKind::Asc,
                TokenKind::Desc,
                TokenKind::Desc,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_longest_match_prefers_identifier() {
        assert_eq!(
            kinds("selection ascend nothing 12ab"),
            vec![
                TokenKind::Identifier("selection"),
                TokenKind::Identifier("ascend"),
                TokenKind::Identifier("nothing"),
                TokenKind::Identifier("12ab"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            kinds("Account.Name first_name my-field [Field With Spaces]"),
            vec![
                TokenKind::Identifier("Account.Name"),
                TokenKind::Identifier("first_name"),
                TokenKind::Identifier("my-field"),
                TokenKind::Identifier("Field With Spaces"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14 1.2.3"),
            vec![
                TokenKind::Integer("42"),
                TokenKind::Double("3.14"),
                TokenKind::Double("1.2.3"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_booleans() {
        assert_eq!(
            kinds("true FALSE"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dates_and_datetimes() {
        assert_eq!(
            kinds("2024-01-31 2024-01-31T10:20:30Z 2024-01-31T10:20:30.123+02:00 2024-01-31T10:20:30-05:30"),
            vec![
                TokenKind::Date("2024-01-31"),
                TokenKind::DateTime("2024-01-31T10:20:30Z"),
                TokenKind::DateTime("2024-01-31T10:20:30.123+02:00"),
                TokenKind::DateTime("2024-01-31T10:20:30-05:30"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings_with_both_quotes() {
        assert_eq!(
            kinds(r#"'single' "double""#),
            vec![
                TokenKind::String(Cow::Borrowed("single")),
                TokenKind::String(Cow::Borrowed("double")),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let kinds = kinds(r#"'it\'s' "a\tb\n" "A\\" 'say \"hi\"'"#);
        assert_eq!(kinds[0], TokenKind::String(Cow::Borrowed("it's")));
        assert_eq!(kinds[1], TokenKind::String(Cow::Borrowed("a\tb\n")));
        assert_eq!(kinds[2], TokenKind::String(Cow::Borrowed("A\\")));
        assert_eq!(kinds[3], TokenKind::String(Cow::Borrowed("say \"hi\"")));
    }

    #[test]
    fn test_unicode_and_control_escapes() {
        let kinds = kinds(r"'\u0041\b\f\r' 'été'");
        assert_eq!(kinds[0], TokenKind::String(Cow::Borrowed("A\u{8}\u{c}\r")));
        assert_eq!(kinds[1], TokenKind::String(Cow::Borrowed("été")));
    }

    #[test]
    fn test_string_may_span_lines() {
        let tokens: Vec<_> = Lexer::new("'line1\nline2' x")
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(tokens[0].kind, TokenKind::String(Cow::Borrowed("line1\nline2")));
        // 字符串之后的位置按换行继续计数
        assert_eq!(tokens[1].position, Position::new(14, 2, 8));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = first_error("name = 'abc");
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.position, Position::new(7, 1, 8));
    }

    #[test]
    fn test_invalid_escape_is_error() {
        let err = first_error(r#"'\q'"#);
        assert!(err.message.contains("invalid escape"));
        let err = first_error(r#"'\u12'"#);
        assert!(err.message.contains("four hex digits"));
    }

    #[test]
    fn test_embedded_expression() {
        assert_eq!(
            kinds("#[vars.limit] #[payload[0]['a]b']]"),
            vec![
                TokenKind::Embedded("#[vars.limit]"),
                TokenKind::Embedded("#[payload[0]['a]b']]"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unbalanced_embedded_expression_is_error() {
        let err = first_error("LIMIT #[payload[0]");
        assert!(err.message.contains("unbalanced"));
        assert_eq!(err.position.column, 7);
    }

    #[test]
    fn test_comments_and_whitespace_are_skipped() {
        let input = "SELECT -- the fields\n  name\n-- trailing comment";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Select,
                TokenKind::Identifier("name"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_illegal_character() {
        let err = first_error("SELECT a FROM T WHERE a != 1");
        assert_eq!(err.message, "illegal character '!'");
        assert_eq!(err.position, Position::new(24, 1, 25));
    }

    #[test]
    fn test_lexer_stops_after_error() {
        let mut lexer = Lexer::new("a ! b");
        assert!(lexer.next().unwrap().is_ok());
        assert!(lexer.next().unwrap().is_err());
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn test_starting_at_offset() {
        let mut lexer = Lexer::starting_at("dsql:SELECT", 5);
        let token = lexer.next().unwrap().unwrap();
        assert_eq!(token.kind, TokenKind::Select);
        assert_eq!(token.position, Position::new(5, 1, 6));
        assert_eq!(token.lexeme, "SELECT");
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens: Vec<_> = Lexer::new("SELECT *\nFROM T")
            .map(Result::unwrap)
            .collect();
        assert_eq!(tokens[2].position, Position::new(9, 2, 1));
        assert_eq!(tokens[3].position, Position::new(14, 2, 6));
        assert_eq!(tokens[3].lexeme, "T");
        assert_eq!(tokens[3].span, Span::new(14, 15));
    }
}
