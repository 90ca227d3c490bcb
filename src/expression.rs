//! The filter expression tree carried by a built [`Query`](crate::query::Query).
//!
//! Expressions are built once while lowering the `WHERE` clause and are never
//! mutated afterwards. Each node owns its children; there is no sharing.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::query::Field;
use crate::translator::Translator;

/// Comparison operators and comparators. All of them share one precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComparisonOperator {
    Eq,    // =
    NotEq, // <>
    Lt,    // <
    Lte,   // <=
    Gt,    // >
    Gte,   // >=
    Like,  // LIKE
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::NotEq => "<>",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Like => "LIKE",
        }
    }

    /// `LIKE` is a comparator; everything else is an operator.
    pub fn is_comparator(&self) -> bool {
        matches!(self, ComparisonOperator::Like)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `AND` and `OR`. They share one precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("AND"),
            LogicalOperator::Or => f.write_str("OR"),
        }
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
    Null,
    /// A deferred `#[...]` expression, kept verbatim.
    Embedded(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Literal::Integer(n) => write!(f, "{n}"),
            Literal::Double(d) => write!(f, "{d:?}"),
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Literal::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Literal::Null => f.write_str("NULL"),
            Literal::Embedded(raw) => f.write_str(raw),
        }
    }
}

/// A filter expression.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum Expression {
    Field(Field),
    Literal(Literal),
    Comparison {
        operator: ComparisonOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    /// No filter at all.
    #[default]
    Empty,
}

impl Expression {
    pub fn field(name: impl Into<String>) -> Self {
        Expression::Field(Field::new(name))
    }

    pub fn literal(literal: Literal) -> Self {
        Expression::Literal(literal)
    }

    pub fn comparison(operator: ComparisonOperator, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(inner: Expression) -> Self {
        Expression::Not(Box::new(inner))
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::Or(Box::new(left), Box::new(right))
    }

    /// Combines two operands with the given logical operator.
    pub fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Self {
        match operator {
            LogicalOperator::And => Expression::and(left, right),
            LogicalOperator::Or => Expression::or(left, right),
        }
    }

    /// True only for [`Expression::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Expression::Empty)
    }

    /// Drives the translator over this tree in post-order: operands first,
    /// then the node itself. `Empty` produces no calls.
    pub fn accept<T: Translator + ?Sized>(&self, translator: &mut T) {
        match self {
            Expression::Field(field) => translator.translate_field(field),
            Expression::Literal(literal) => translator.translate_literal(literal),
            Expression::Comparison { operator, left, right } => {
                left.accept(translator);
                right.accept(translator);
                translator.translate_comparison(*operator);
            }
            Expression::Not(inner) => {
                inner.accept(translator);
                translator.translate_not();
            }
            Expression::And(left, right) => {
                left.accept(translator);
                right.accept(translator);
                translator.translate_and();
            }
            Expression::Or(left, right) => {
                left.accept(translator);
                right.accept(translator);
                translator.translate_or();
            }
            Expression::Empty => {}
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Field(field) => write!(f, "{}", field.name()),
            Expression::Literal(literal) => write!(f, "{literal}"),
            Expression::Comparison { operator, left, right } => {
                write!(f, "({left} {operator} {right})")
            }
            Expression::Not(inner) => write!(f, "NOT {inner}"),
            Expression::And(left, right) => write!(f, "({left} AND {right})"),
            Expression::Or(left, right) => write!(f, "({left} OR {right})"),
            Expression::Empty => Ok(()),
        }
    }
}
