//! The frozen query value and the builder that produces it.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::expression::Expression;
use crate::translator::Translator;

/// The name used for the "all fields" projection.
pub const WILDCARD: &str = "*";

/// A selected or ordering field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Field {
    name: String,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn wildcard() -> Self {
        Self::new(WILDCARD)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_wildcard(&self) -> bool {
        self.name == WILDCARD
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The entity (or entities) a query reads from.
///
/// A `FROM` clause naming several sources produces a composite type that keeps
/// every name in declared order. It is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EntityType {
    names: Vec<String>,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    /// Appends another source to this type.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// The first (primary) source name.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_composite(&self) -> bool {
        self.names.len() > 1
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names.join(", "))
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Ascending => f.write_str("ASC"),
            Direction::Descending => f.write_str("DESC"),
        }
    }
}

/// Raised when an AST cannot be turned into a [`Query`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct BuildError {
    pub message: String,
}

impl BuildError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An immutable, fully built query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    #[serde(rename = "type")]
    entity_type: EntityType,
    fields: Vec<Field>,
    order_by_fields: Vec<Field>,
    direction: Direction,
    filter: Expression,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    pub fn entity_type(&self) -> &EntityType {
        &self.entity_type
    }

    /// The selected fields. Never empty: a `SELECT *` yields the single wildcard field.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn order_by_fields(&self) -> &[Field] {
        &self.order_by_fields
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The filter, [`Expression::Empty`] when the query has no `WHERE` clause.
    pub fn filter(&self) -> &Expression {
        &self.filter
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Renders this query with the given translator.
    ///
    /// See [`Translator`] for the order in which phases are driven.
    pub fn translate<T: Translator + ?Sized>(&self, translator: &mut T) -> String {
        translator.translate_fields(&self.fields);
        translator.translate_types(&self.entity_type);
        if !self.filter.is_empty() {
            translator.translate_begin_expression();
            self.filter.accept(translator);
        }
        if !self.order_by_fields.is_empty() {
            translator.translate_order_by_fields(&self.order_by_fields, self.direction);
        }
        if let Some(limit) = self.limit {
            translator.translate_limit(limit);
        }
        if let Some(offset) = self.offset {
            translator.translate_offset(offset);
        }
        translator.translation()
    }
}

/// Accumulates the parts of a query, then freezes them with [`QueryBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    entity_type: Option<EntityType>,
    fields: Vec<Field>,
    order_by_fields: Vec<Field>,
    direction: Direction,
    filter: Expression,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_type(&mut self, entity_type: EntityType) -> &mut Self {
        self.entity_type = Some(entity_type);
        self
    }

    /// Appends a selected field. Duplicates are kept.
    pub fn add_field(&mut self, field: Field) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn add_order_by_field(&mut self, field: Field) -> &mut Self {
        self.order_by_fields.push(field);
        self
    }

    pub fn set_direction(&mut self, direction: Direction) -> &mut Self {
        self.direction = direction;
        self
    }

    pub fn set_filter_expression(&mut self, filter: Expression) -> &mut Self {
        self.filter = filter;
        self
    }

    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn set_offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    /// Freezes the builder into a [`Query`].
    ///
    /// Fails if no entity type was set. With no fields, the query selects the
    /// wildcard field. The builder is left untouched, so a setter chain can end
    /// in `build()` directly and a builder can be reused as a template.
    pub fn build(&self) -> Result<Query, BuildError> {
        let entity_type = self
            .entity_type
            .clone()
            .ok_or_else(|| BuildError::new("query has no entity type (missing FROM clause)"))?;

        let fields = if self.fields.is_empty() {
            vec![Field::wildcard()]
        } else {
            self.fields.clone()
        };

        Ok(Query {
            entity_type,
            fields,
            order_by_fields: self.order_by_fields.clone(),
            direction: self.direction,
            filter: self.filter.clone(),
            limit: self.limit,
            offset: self.offset,
        })
    }
}
