//! DSQL 语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   ├─ 期望 SELECT
//!   ├─ "*" 或 parse_field_list()
//!   ├─ 期望 FROM → parse_field_list() (实体列表)
//!   ├─ WHERE    → parse_expression()
//!   ├─ ORDER BY → parse_field_list() + 可选 ASC/DESC
//!   ├─ LIMIT    → parse_number()
//!   ├─ OFFSET   → parse_number()
//!   └─ 期望输入结束
//!
//! parse_expression()
//!   └─ parse_negation() (("AND" | "OR") parse_negation())*
//!        ├─ "NOT" → parse_negation() (允许 NOT NOT ...)
//!        └─ parse_relation()
//!             └─ parse_term() ((OPERATOR | LIKE) parse_operand())*
//!                  ├─ parse_operand(): "NOT"* parse_term()
//!                  ├─ "(" → parse_expression() ")"
//!                  └─ 标识符 / 字面量 / NULL
//! ```
//!
//! ## 优先级
//!
//! `AND` 与 `OR` 处于同一优先级, 从左到右结合: `a AND b OR c` 解析为
//! `(a AND b) OR c`, `a OR b AND c` 解析为 `(a OR b) AND c`。所有比较运算符
//! (`= > < <= <> >= LIKE`) 也处于同一优先级, 同样左结合。`NOT` 作用于其后
//! 的整个比较: `NOT a = 1` 等价于 `NOT (a = 1)`。比较运算符右侧的 `NOT`
//! 只作用于紧随其后的操作数: `a = NOT b` 等价于 `a = (NOT b)`。
//!
//! Tokens are pulled from the lexer one at a time; the parser keeps a single
//! token of lookahead and stops at the first error.

use thiserror::Error;
use tracing::trace;

use crate::ast::{
    EntityRef, FieldRef, Lexeme, Limit, Node, NumberExpr, Offset, OrderBy, Projection, Select,
    SortDirection,
};
use crate::error::DsqlError;
use crate::expression::LogicalOperator;
use crate::lexer::Lexer;
use crate::token::{Position, Token, TokenKind};

/// Raised on the first token that does not fit the grammar.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}{}", .position.map(|p| format!(" at {p}")).unwrap_or_default())]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
}

impl ParseError {
    fn new(message: String, position: Option<Position>) -> Self {
        Self { message, position }
    }

    fn at_position(message: String, position: Position) -> Self {
        Self {
            message,
            position: Some(position),
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    /// 当前 token (尚未消费)
    lookahead: Option<Token<'a>>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self::from_lexer(Lexer::new(input))
    }

    pub fn from_lexer(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            lookahead: None,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&mut self) -> Result<&Token<'a>, DsqlError> {
        if self.lookahead.is_none() {
            match self.lexer.next() {
                Some(Ok(token)) => self.lookahead = Some(token),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    return Err(ParseError::new("Unexpected end of input".to_string(), None).into());
                }
            }
        }
        match self.lookahead.as_ref() {
            Some(token) => Ok(token),
            None => Err(ParseError::new("Unexpected end of input".to_string(), None).into()),
        }
    }

    /// 返回当前 token 并推进位置. EOF 不会被消费.
    fn advance(&mut self) -> Result<Token<'a>, DsqlError> {
        self.peek()?;
        match self.lookahead.take() {
            Some(token) => {
                if token.kind == TokenKind::Eof {
                    self.lookahead = Some(token.clone());
                }
                Ok(token)
            }
            None => Err(ParseError::new("Unexpected end of input".to_string(), None).into()),
        }
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&mut self, kind: &TokenKind) -> Result<bool, DsqlError> {
        let token = self.peek()?;
        Ok(std::mem::discriminant(&token.kind) == std::mem::discriminant(kind))
    }

    /// 如果当前 token 匹配则消费它
    fn eat(&mut self, kind: &TokenKind) -> Result<bool, DsqlError> {
        if self.match_token(kind)? {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind<'_>) -> Result<Token<'a>, DsqlError> {
        let token = self.peek()?;
        if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) {
            self.advance()
        } else {
            Err(unexpected(token, &expected.describe()))
        }
    }

    pub fn parse(mut self) -> Result<Select, DsqlError> {
        self.expect(TokenKind::Select)?;

        let fields = if self.eat(&TokenKind::Star)? {
            Projection::Wildcard
        } else {
            Projection::Fields(self.parse_field_list()?)
        };

        self.expect(TokenKind::From)?;
        let sources = self
            .parse_field_list()?
            .into_iter()
            .map(|FieldRef(name)| EntityRef(name))
            .collect();

        let filter = if self.eat(&TokenKind::Where)? {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let order_by = if self.eat(&TokenKind::Order)? {
            Some(self.parse_order_by()?)
        } else {
            None
        };

        let limit = if self.eat(&TokenKind::Limit)? {
            Some(Limit(self.parse_number()?))
        } else {
            None
        };

        let offset = if self.eat(&TokenKind::Offset)? {
            Some(Offset(self.parse_number()?))
        } else {
            None
        };

        self.expect(TokenKind::Eof)?;
        trace!("parsed SELECT statement");

        Ok(Select {
            fields,
            sources,
            filter,
            order_by,
            limit,
            offset,
        })
    }

    /// 语法: `field ("," field)*`
    fn parse_field_list(&mut self) -> Result<Vec<FieldRef>, DsqlError> {
        let mut fields = vec![self.parse_field()?];
        while self.eat(&TokenKind::Comma)? {
            fields.push(self.parse_field()?);
        }
        Ok(fields)
    }

    /// 字段名可以是标识符或字符串字面量
    fn parse_field(&mut self) -> Result<FieldRef, DsqlError> {
        let token = self.peek()?;
        let name = match &token.kind {
            TokenKind::Identifier(name) => name.to_string(),
            TokenKind::String(s) => s.to_string(),
            _ => return Err(unexpected(token, "field name")),
        };
        self.advance()?;
        Ok(FieldRef(name))
    }

    /// 语法: `"BY" field ("," field)* ("ASC" | "DESC")?`. ORDER 已被消费.
    fn parse_order_by(&mut self) -> Result<OrderBy, DsqlError> {
        self.expect(TokenKind::By)?;
        let fields = self.parse_field_list()?;
        let direction = if self.eat(&TokenKind::Asc)? {
            Some(SortDirection::Asc)
        } else if self.eat(&TokenKind::Desc)? {
            Some(SortDirection::Desc)
        } else {
            None
        };
        Ok(OrderBy { fields, direction })
    }

    fn parse_number(&mut self) -> Result<NumberExpr, DsqlError> {
        let token = self.peek()?;
        let number = match &token.kind {
            TokenKind::Integer(n) => NumberExpr::Integer(n.to_string()),
            TokenKind::Double(n) => NumberExpr::Double(n.to_string()),
            TokenKind::Embedded(e) => NumberExpr::Embedded(e.to_string()),
            _ => return Err(unexpected(token, "number or embedded expression")),
        };
        self.advance()?;
        Ok(number)
    }

    /// 解析条件表达式
    ///
    /// 语法: `negation (("AND" | "OR") negation)*`, 左结合
    fn parse_expression(&mut self) -> Result<Node, DsqlError> {
        let mut left = self.parse_negation()?;

        loop {
            let op = match self.peek()?.kind {
                TokenKind::And => LogicalOperator::And,
                TokenKind::Or => LogicalOperator::Or,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_negation()?;
            left = Node::BinaryBool {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// 语法: `"NOT" negation | relation`
    fn parse_negation(&mut self) -> Result<Node, DsqlError> {
        if self.eat(&TokenKind::Not)? {
            let inner = self.parse_negation()?; // 允许 NOT 链式调用
            Ok(Node::Not(Box::new(inner)))
        } else {
            self.parse_relation()
        }
    }

    /// 语法: `term ((OPERATOR | COMPARATOR) operand)*`, 左结合
    fn parse_relation(&mut self) -> Result<Node, DsqlError> {
        let mut left = self.parse_term()?;

        while let Some(op) = self.peek()?.kind.comparison_operator() {
            self.advance()?;
            let right = self.parse_operand()?;
            left = Node::BinaryCompare {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// 比较运算符右侧的操作数, 语法: `"NOT"* term`.
    /// 这里的 NOT 只作用于紧随其后的 term: `a = NOT b` 即 `a = (NOT b)`.
    fn parse_operand(&mut self) -> Result<Node, DsqlError> {
        if self.eat(&TokenKind::Not)? {
            let inner = self.parse_operand()?;
            Ok(Node::Not(Box::new(inner)))
        } else {
            self.parse_term()
        }
    }

    /// 解析基础表达式: 括号分组、标识符或字面量
    fn parse_term(&mut self) -> Result<Node, DsqlError> {
        if self.eat(&TokenKind::LParen)? {
            let inner = self.parse_expression()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Node::Group(Box::new(inner)));
        }

        let token = self.peek()?;
        let position = token.position;
        let node = match &token.kind {
            TokenKind::Identifier(name) => Node::Identifier(name.to_string()),
            TokenKind::String(s) => Node::StringLit(s.to_string()),
            TokenKind::Integer(n) => Node::IntLit(Lexeme::new(*n, position)),
            TokenKind::Double(n) => Node::DoubleLit(Lexeme::new(*n, position)),
            TokenKind::Embedded(e) => Node::EmbeddedExpr(e.to_string()),
            TokenKind::Boolean(b) => Node::BoolLit(*b),
            TokenKind::DateTime(d) => Node::DateTimeLit(Lexeme::new(*d, position)),
            TokenKind::Date(d) => Node::DateLit(Lexeme::new(*d, position)),
            TokenKind::Null => Node::NullLit,
            _ => return Err(unexpected(token, "expression")),
        };
        self.advance()?;
        Ok(node)
    }
}

fn unexpected(token: &Token<'_>, expected: &str) -> DsqlError {
    ParseError::at_position(
        format!("Expected {expected}, found {}", token.kind.describe()),
        token.position,
    )
    .into()
}
