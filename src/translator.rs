//! The contract for rendering a [`Query`](crate::query::Query) into another query language.

use crate::expression::{ComparisonOperator, Literal};
use crate::query::{Direction, EntityType, Field};

/// A visitor that turns a query into a target query string.
///
/// [`Query::translate`](crate::query::Query::translate) calls the phases in a
/// fixed order:
///
/// 1. [`translate_fields`](Translator::translate_fields)
/// 2. [`translate_types`](Translator::translate_types)
/// 3. if the query has a filter: [`translate_begin_expression`](Translator::translate_begin_expression),
///    then the filter tree in post-order (operands before the node that combines them)
/// 4. if the query orders its results: [`translate_order_by_fields`](Translator::translate_order_by_fields)
/// 5. if a limit is set: [`translate_limit`](Translator::translate_limit)
/// 6. if an offset is set: [`translate_offset`](Translator::translate_offset)
///
/// and finally [`translation`](Translator::translation). Absent clauses produce
/// no calls at all.
pub trait Translator {
    fn translate_fields(&mut self, fields: &[Field]);

    fn translate_types(&mut self, entity_type: &EntityType);

    /// Marks the start of the filter. Only called when a filter is present.
    fn translate_begin_expression(&mut self);

    fn translate_field(&mut self, field: &Field);

    fn translate_literal(&mut self, literal: &Literal);

    /// Combines the two most recently translated operands.
    fn translate_comparison(&mut self, operator: ComparisonOperator);

    fn translate_and(&mut self);

    fn translate_or(&mut self);

    /// Negates the most recently translated operand.
    fn translate_not(&mut self);

    fn translate_order_by_fields(&mut self, fields: &[Field], direction: Direction);

    fn translate_limit(&mut self, limit: u64);

    fn translate_offset(&mut self, offset: u64);

    /// Returns the rendered query.
    fn translation(&mut self) -> String;
}
