//! A [`Translator`] that renders queries as SQL using sea-query.

use std::fmt::Write;

use sea_query::{
    Asterisk, BinOper, Expr, Iden, Keyword, MysqlQueryBuilder, Order, PostgresQueryBuilder,
    SelectStatement, SimpleExpr, SqliteQueryBuilder, UnOper, Value,
};
use tracing::{trace, warn};

use crate::config::{SqlDialect, TranslatorConfig};
use crate::expression::{ComparisonOperator, Literal};
use crate::query::{Direction, EntityType, Field};
use crate::translator::Translator;

/// Table identifier for sea-query
#[derive(Debug, Clone)]
pub struct TableName(pub String);

impl Iden for TableName {
    fn unquoted(&self, s: &mut dyn Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Column identifier wrapper
#[derive(Debug, Clone)]
pub struct ColumnName(pub String);

impl Iden for ColumnName {
    fn unquoted(&self, s: &mut dyn Write) {
        let _ = s.write_str(&self.0);
    }
}

/// Renders a [`Query`](crate::query::Query) as a single `SELECT` statement.
///
/// Filter events arrive in post-order and are folded on an operand stack.
/// After [`translation`](Translator::translation) the translator is reset and
/// can be reused.
#[derive(Debug, Default)]
pub struct SqlTranslator {
    config: TranslatorConfig,
    select: SelectStatement,
    operands: Vec<SimpleExpr>,
}

impl SqlTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TranslatorConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut TranslatorConfig {
        &mut self.config
    }

    fn column(&self, name: &str) -> ColumnName {
        ColumnName(self.config.column_name(name).to_string())
    }

    fn pop_pair(&mut self, what: &str) -> Option<(SimpleExpr, SimpleExpr)> {
        match (self.operands.pop(), self.operands.pop()) {
            (Some(right), Some(left)) => Some((left, right)),
            _ => {
                warn!("{what} is missing an operand; dropping it");
                None
            }
        }
    }

    fn combine(&mut self, oper: BinOper, what: &str) {
        if let Some((left, right)) = self.pop_pair(what) {
            self.operands
                .push(SimpleExpr::Binary(Box::new(left), oper, Box::new(right)));
        }
    }
}

fn literal_to_expr(literal: &Literal) -> SimpleExpr {
    match literal {
        Literal::String(s) => SimpleExpr::Value(Value::String(Some(Box::new(s.clone())))),
        Literal::Integer(n) => SimpleExpr::Value(Value::BigInt(Some(*n))),
        Literal::Double(d) => SimpleExpr::Value(Value::Double(Some(*d))),
        Literal::Boolean(b) => SimpleExpr::Value(Value::Bool(Some(*b))),
        Literal::Date(d) => SimpleExpr::Value(Value::from(*d)),
        Literal::DateTime(dt) => SimpleExpr::Value(Value::from(*dt)),
        Literal::Null => SimpleExpr::Keyword(Keyword::Null),
        // Deferred values stay opaque; the caller resolves them before execution.
        Literal::Embedded(raw) => SimpleExpr::Value(Value::String(Some(Box::new(raw.clone())))),
    }
}

fn comparison_oper(operator: ComparisonOperator, right_is_null: bool) -> BinOper {
    match operator {
        ComparisonOperator::Eq if right_is_null => BinOper::Is,
        ComparisonOperator::NotEq if right_is_null => BinOper::IsNot,
        ComparisonOperator::Eq => BinOper::Equal,
        ComparisonOperator::NotEq => BinOper::NotEqual,
        ComparisonOperator::Lt => BinOper::SmallerThan,
        ComparisonOperator::Lte => BinOper::SmallerThanOrEqual,
        ComparisonOperator::Gt => BinOper::GreaterThan,
        ComparisonOperator::Gte => BinOper::GreaterThanOrEqual,
        ComparisonOperator::Like => BinOper::Like,
    }
}

impl Translator for SqlTranslator {
    fn translate_fields(&mut self, fields: &[Field]) {
        for field in fields {
            if field.is_wildcard() {
                self.select.column(Asterisk);
            } else {
                let column = self.column(field.name());
                self.select.column(column);
            }
        }
    }

    fn translate_types(&mut self, entity_type: &EntityType) {
        for name in entity_type.names() {
            let table = TableName(self.config.table_name(name).to_string());
            self.select.from(table);
        }
    }

    fn translate_begin_expression(&mut self) {
        self.operands.clear();
    }

    fn translate_field(&mut self, field: &Field) {
        let column = self.column(field.name());
        self.operands.push(Expr::col(column).into());
    }

    fn translate_literal(&mut self, literal: &Literal) {
        self.operands.push(literal_to_expr(literal));
    }

    fn translate_comparison(&mut self, operator: ComparisonOperator) {
        let right_is_null = matches!(
            self.operands.last(),
            Some(SimpleExpr::Keyword(Keyword::Null))
        );
        self.combine(comparison_oper(operator, right_is_null), operator.as_str());
    }

    fn translate_and(&mut self) {
        self.combine(BinOper::And, "AND");
    }

    fn translate_or(&mut self) {
        self.combine(BinOper::Or, "OR");
    }

    fn translate_not(&mut self) {
        match self.operands.pop() {
            Some(inner) => self
                .operands
                .push(SimpleExpr::Unary(UnOper::Not, Box::new(inner))),
            None => warn!("NOT is missing an operand; dropping it"),
        }
    }

    fn translate_order_by_fields(&mut self, fields: &[Field], direction: Direction) {
        let order = match direction {
            Direction::Ascending => Order::Asc,
            Direction::Descending => Order::Desc,
        };
        for field in fields {
            let column = self.column(field.name());
            self.select.order_by(column, order.clone());
        }
    }

    fn translate_limit(&mut self, limit: u64) {
        self.select.limit(limit);
    }

    fn translate_offset(&mut self, offset: u64) {
        self.select.offset(offset);
    }

    fn translation(&mut self) -> String {
        if let Some(filter) = self.operands.pop() {
            self.select.and_where(filter);
        }
        if !self.operands.is_empty() {
            warn!(count = self.operands.len(), "unused filter operands");
            self.operands.clear();
        }

        let select = std::mem::take(&mut self.select);
        let sql = match self.config.dialect {
            SqlDialect::Postgres => select.to_string(PostgresQueryBuilder),
            SqlDialect::Mysql => select.to_string(MysqlQueryBuilder),
            SqlDialect::Sqlite => select.to_string(SqliteQueryBuilder),
        };
        trace!(%sql, dialect = %self.config.dialect, "translated query");
        sql
    }
}
