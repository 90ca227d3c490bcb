//! AST 节点定义, 由 [`Parser`](crate::parser::Parser) 生成

use crate::expression::{ComparisonOperator, LogicalOperator};
use crate::token::Position;

/// AST 的根节点, 代表一个完整的 `SELECT` 语句
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub fields: Projection,
    /// `FROM` 之后的实体列表, 至少一个
    pub sources: Vec<EntityRef>,
    pub filter: Option<Node>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
    pub offset: Option<Offset>,
}

/// `SELECT` 与 `FROM` 之间的部分
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Wildcard,
    Fields(Vec<FieldRef>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRef(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub fields: Vec<FieldRef>,
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit(pub NumberExpr);

#[derive(Debug, Clone, PartialEq)]
pub struct Offset(pub NumberExpr);

/// `LIMIT`/`OFFSET` 的值, 保持未解析的原始文本
#[derive(Debug, Clone, PartialEq)]
pub enum NumberExpr {
    Integer(String),
    Double(String),
    Embedded(String),
}

/// `WHERE` 条件表达式树
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// 逻辑运算 (AND / OR)
    BinaryBool {
        op: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// 比较运算 (= > < <= <> >= LIKE)
    BinaryCompare {
        op: ComparisonOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// 逻辑非运算 (NOT)
    Not(Box<Node>),
    /// 使用括号分组的表达式
    Group(Box<Node>),
    Identifier(String),
    StringLit(String),
    IntLit(Lexeme),
    DoubleLit(Lexeme),
    BoolLit(bool),
    DateLit(Lexeme),
    DateTimeLit(Lexeme),
    NullLit,
    EmbeddedExpr(String),
}

/// 字面量的原始文本及其位置, 供构建阶段报错使用
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub text: String,
    pub position: Position,
}

impl Lexeme {
    pub fn new(text: impl Into<String>, position: Position) -> Self {
        Self {
            text: text.into(),
            position,
        }
    }
}
