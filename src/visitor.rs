//! Lowers a parsed [`Select`] into a [`QueryBuilder`].
//!
//! The walk is single-pass and depth-first. Parenthesized groups are folded
//! away: `(a = 1)` and `a = 1` lower to the same expression.

use chrono::{DateTime, NaiveDate};
use tracing::trace;

use crate::ast::{EntityRef, Lexeme, Node, NumberExpr, OrderBy, Projection, Select, SortDirection};
use crate::expression::{Expression, Literal};
use crate::query::{BuildError, Direction, EntityType, Field, QueryBuilder};

/// Walks `select` and returns the populated builder.
pub fn build(select: &Select) -> Result<QueryBuilder, BuildError> {
    let mut visitor = QueryBuilderVisitor::new();
    visitor.visit_select(select)?;
    Ok(visitor.into_builder())
}

#[derive(Debug, Default)]
pub struct QueryBuilderVisitor {
    builder: QueryBuilder,
}

impl QueryBuilderVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_builder(self) -> QueryBuilder {
        self.builder
    }

    pub fn visit_select(&mut self, select: &Select) -> Result<(), BuildError> {
        self.visit_sources(&select.sources);
        self.visit_projection(&select.fields);

        if let Some(filter) = &select.filter {
            let expression = self.visit_node(filter)?;
            self.builder.set_filter_expression(expression);
        }
        if let Some(order_by) = &select.order_by {
            self.visit_order_by(order_by);
        }
        if let Some(limit) = &select.limit {
            let limit = lower_number("LIMIT", &limit.0)?;
            self.builder.set_limit(limit);
        }
        if let Some(offset) = &select.offset {
            let offset = lower_number("OFFSET", &offset.0)?;
            self.builder.set_offset(offset);
        }
        Ok(())
    }

    /// Every source joins one composite entity type, in declared order.
    fn visit_sources(&mut self, sources: &[EntityRef]) {
        let mut names = sources.iter().map(|EntityRef(name)| name.as_str());
        let Some(first) = names.next() else {
            return;
        };
        let entity_type = names.fold(EntityType::new(first), EntityType::with);
        trace!(%entity_type, "visited sources");
        self.builder.set_type(entity_type);
    }

    /// A wildcard leaves the field list empty; the builder fills in `*`.
    fn visit_projection(&mut self, projection: &Projection) {
        if let Projection::Fields(fields) = projection {
            for field in fields {
                self.builder.add_field(Field::new(field.0.as_str()));
            }
        }
    }

    fn visit_order_by(&mut self, order_by: &OrderBy) {
        for field in &order_by.fields {
            self.builder.add_order_by_field(Field::new(field.0.as_str()));
        }
        let direction = match order_by.direction {
            Some(SortDirection::Desc) => Direction::Descending,
            Some(SortDirection::Asc) | None => Direction::Ascending,
        };
        self.builder.set_direction(direction);
    }

    pub fn visit_node(&self, node: &Node) -> Result<Expression, BuildError> {
        let expression = match node {
            Node::BinaryBool { op, left, right } => {
                Expression::logical(*op, self.visit_node(left)?, self.visit_node(right)?)
            }
            Node::BinaryCompare { op, left, right } => {
                Expression::comparison(*op, self.visit_node(left)?, self.visit_node(right)?)
            }
            Node::Not(inner) => Expression::not(self.visit_node(inner)?),
            Node::Group(inner) => self.visit_node(inner)?,
            Node::Identifier(name) => Expression::field(name.as_str()),
            Node::StringLit(s) => Expression::literal(Literal::String(s.clone())),
            Node::IntLit(lexeme) => Expression::literal(lower_integer(lexeme)?),
            Node::DoubleLit(lexeme) => Expression::literal(lower_double(lexeme)?),
            Node::BoolLit(b) => Expression::literal(Literal::Boolean(*b)),
            Node::DateLit(lexeme) => Expression::literal(lower_date(lexeme)?),
            Node::DateTimeLit(lexeme) => Expression::literal(lower_datetime(lexeme)?),
            Node::NullLit => Expression::literal(Literal::Null),
            Node::EmbeddedExpr(raw) => Expression::literal(Literal::Embedded(raw.clone())),
        };
        Ok(expression)
    }
}

fn invalid_literal(kind: &str, lexeme: &Lexeme, reason: impl std::fmt::Display) -> BuildError {
    BuildError::new(format!(
        "invalid {kind} literal `{}` at {}: {reason}",
        lexeme.text, lexeme.position
    ))
}

fn lower_integer(lexeme: &Lexeme) -> Result<Literal, BuildError> {
    lexeme
        .text
        .parse::<i64>()
        .map(Literal::Integer)
        .map_err(|e| invalid_literal("integer", lexeme, e))
}

/// The lexer accepts any run of digits and dots, so `1.2.3` is rejected here.
fn lower_double(lexeme: &Lexeme) -> Result<Literal, BuildError> {
    lexeme
        .text
        .parse::<f64>()
        .map(Literal::Double)
        .map_err(|e| invalid_literal("double", lexeme, e))
}

fn lower_date(lexeme: &Lexeme) -> Result<Literal, BuildError> {
    NaiveDate::parse_from_str(&lexeme.text, "%Y-%m-%d")
        .map(Literal::Date)
        .map_err(|e| invalid_literal("date", lexeme, e))
}

fn lower_datetime(lexeme: &Lexeme) -> Result<Literal, BuildError> {
    DateTime::parse_from_rfc3339(&lexeme.text)
        .map(Literal::DateTime)
        .map_err(|e| invalid_literal("date-time", lexeme, e))
}

/// Coerces a `LIMIT`/`OFFSET` value to an integer. Deferred values are rejected.
fn lower_number(clause: &str, number: &NumberExpr) -> Result<u64, BuildError> {
    match number {
        NumberExpr::Integer(text) => text
            .parse::<u64>()
            .map_err(|e| BuildError::new(format!("{clause} value `{text}` is invalid: {e}"))),
        NumberExpr::Double(text) => {
            let value = text.parse::<f64>().map_err(|e| {
                BuildError::new(format!("{clause} value `{text}` is invalid: {e}"))
            })?;
            if value.fract() == 0.0 && value >= 0.0 && value < u64::MAX as f64 {
                Ok(value as u64)
            } else {
                Err(BuildError::new(format!(
                    "{clause} value `{text}` is not a whole number"
                )))
            }
        }
        NumberExpr::Embedded(raw) => Err(BuildError::new(format!(
            "{clause} does not support the deferred value `{raw}`"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ComparisonOperator;
    use crate::parser::Parser;
    use crate::query::Query;

    fn build_query(input: &str) -> Result<Query, BuildError> {
        let select = Parser::new(input).parse().unwrap();
        build(&select)?.build()
    }

    fn build_filter(condition: &str) -> Result<Expression, BuildError> {
        let query = build_query(&format!("SELECT * FROM T WHERE {condition}"))?;
        Ok(query.filter().clone())
    }

    #[test]
    fn test_wildcard_defaults_to_star_field() {
        let query = build_query("SELECT * FROM Account").unwrap();
        assert_eq!(query.fields(), &[Field::wildcard()]);
        assert_eq!(query.entity_type(), &EntityType::new("Account"));
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_fields_keep_order_and_duplicates() {
        let query = build_query("SELECT b, a, b FROM T").unwrap();
        assert_eq!(
            query.fields(),
            &[Field::new("b"), Field::new("a"), Field::new("b")]
        );
    }

    #[test]
    fn test_multiple_sources_form_composite_type() {
        let query = build_query("SELECT * FROM Account, Contact").unwrap();
        assert_eq!(query.entity_type().names(), &["Account", "Contact"]);
    }

    #[test]
    fn test_order_by_direction() {
        let query = build_query("SELECT * FROM T ORDER BY a, b").unwrap();
        assert_eq!(query.order_by_fields(), &[Field::new("a"), Field::new("b")]);
        assert_eq!(query.direction(), Direction::Ascending);

        let query = build_query("SELECT * FROM T ORDER BY a DESCENDING").unwrap();
        assert_eq!(query.direction(), Direction::Descending);
    }

    #[test]
    fn test_group_is_transparent() {
        assert_eq!(
            build_filter("(a = 1)").unwrap(),
            build_filter("a = 1").unwrap()
        );
        assert_eq!(
            build_filter("((a = 1) AND (b = 2))").unwrap(),
            build_filter("a = 1 AND b = 2").unwrap()
        );
    }

    #[test]
    fn test_comparison_lowering() {
        assert_eq!(
            build_filter("name LIKE 'J%'").unwrap(),
            Expression::comparison(
                ComparisonOperator::Like,
                Expression::field("name"),
                Expression::literal(Literal::String("J%".to_string())),
            )
        );
    }

    #[test]
    fn test_literal_lowering() {
        let cases = [
            ("42", Literal::Integer(42)),
            ("2.5", Literal::Double(2.5)),
            ("true", Literal::Boolean(true)),
            ("NULL", Literal::Null),
            (
                "2024-02-29",
                Literal::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            ),
            (
                "2024-02-29T08:30:00+02:00",
                Literal::DateTime(DateTime::parse_from_rfc3339("2024-02-29T08:30:00+02:00").unwrap()),
            ),
            ("#[vars.x]", Literal::Embedded("#[vars.x]".to_string())),
        ];
        for (text, expected) in cases {
            let filter = build_filter(&format!("a = {text}")).unwrap();
            let Expression::Comparison { right, .. } = filter else {
                panic!("Expected comparison for {text}");
            };
            assert_eq!(*right, Expression::literal(expected));
        }
    }

    #[test]
    fn test_malformed_double_is_build_error() {
        let err = build_filter("a = 1.2.3").unwrap_err();
        assert!(err.message.contains("invalid double literal `1.2.3`"));
    }

    #[test]
    fn test_invalid_date_is_build_error() {
        let err = build_filter("a = 2023-02-30").unwrap_err();
        assert!(err.message.contains("invalid date literal"));
    }

    #[test]
    fn test_integer_overflow_is_build_error() {
        let err = build_filter("a = 99999999999999999999").unwrap_err();
        assert!(err.message.contains("invalid integer literal"));
    }

    #[test]
    fn test_limit_and_offset() {
        let query = build_query("SELECT * FROM T LIMIT 10 OFFSET 5.0").unwrap();
        assert_eq!(query.limit(), Some(10));
        assert_eq!(query.offset(), Some(5));
    }

    #[test]
    fn test_fractional_limit_is_build_error() {
        let err = build_query("SELECT * FROM T LIMIT 2.5").unwrap_err();
        assert_eq!(err.message, "LIMIT value `2.5` is not a whole number");
    }

    #[test]
    fn test_out_of_range_double_limit_is_build_error() {
        // u64::MAX as f64 rounds up to 2^64
        let err = build_query("SELECT * FROM T LIMIT 18446744073709551616.0").unwrap_err();
        assert_eq!(
            err.message,
            "LIMIT value `18446744073709551616.0` is not a whole number"
        );
        let err = build_query("SELECT * FROM T LIMIT 18446744073709551616").unwrap_err();
        assert!(err.message.starts_with("LIMIT value `18446744073709551616` is invalid"));
    }

    #[test]
    fn test_deferred_offset_is_build_error() {
        let err = build_query("SELECT * FROM T OFFSET #[vars.offset]").unwrap_err();
        assert_eq!(
            err.message,
            "OFFSET does not support the deferred value `#[vars.offset]`"
        );
    }

    #[test]
    fn test_missing_sources_fail_at_build() {
        let select = Select {
            fields: Projection::Wildcard,
            sources: vec![],
            filter: None,
            order_by: None,
            limit: None,
            offset: None,
        };
        let builder = build(&select).unwrap();
        assert!(builder.build().is_err());
    }
}
