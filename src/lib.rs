//! DSQL: a small query language for entity resources.
//!
//! ```text
//! dsql:SELECT name, age FROM Account WHERE age > 21 ORDER BY name DESC LIMIT 10 OFFSET 5
//! ```
//!
//! Text goes through [`lexer`] → [`parser`] → [`visitor`] and comes out as an
//! immutable [`Query`]. A `Query` is consumed by handing it a [`Translator`],
//! which renders it into another query language (see [`SqlTranslator`]).

pub mod ast;
pub mod config;
pub mod error;
pub mod expression;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod sql_translator;
pub mod token;
pub mod translator;
pub mod visitor;

use tracing::debug;

pub use config::{SqlDialect, TranslatorConfig};
pub use error::DsqlError;
pub use expression::{ComparisonOperator, Expression, Literal, LogicalOperator};
pub use query::{Direction, EntityType, Field, Query, QueryBuilder};
pub use sql_translator::SqlTranslator;
pub use translator::Translator;

/// Case-insensitive discriminator every DSQL query starts with.
pub const DSQL_PREFIX: &str = "dsql:";

/// True if `text` starts with `dsql:` (any case) and has something after it.
pub fn is_dsql_query(text: &str) -> bool {
    text.len() > DSQL_PREFIX.len()
        && text
            .get(..DSQL_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(DSQL_PREFIX))
}

/// Parses a `dsql:`-prefixed query into a [`Query`].
pub fn parse(text: &str) -> Result<Query, DsqlError> {
    if !is_dsql_query(text) {
        return Err(DsqlError::Usage(format!(
            "not a DSQL query, expected the `{DSQL_PREFIX}` prefix: {text:?}"
        )));
    }

    let lexer = lexer::Lexer::starting_at(text, DSQL_PREFIX.len());
    let select = parser::Parser::from_lexer(lexer).parse()?;
    let query = visitor::build(&select)?.build()?;
    debug!(entity_type = %query.entity_type(), filtered = !query.filter().is_empty(), "parsed DSQL query");
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_dsql_query() {
        assert!(is_dsql_query("dsql:SELECT * FROM T"));
        assert!(is_dsql_query("DSQL:SELECT * FROM T"));
        assert!(is_dsql_query("Dsql:x"));
        assert!(!is_dsql_query("dsql:"));
        assert!(!is_dsql_query("dsq"));
        assert!(!is_dsql_query("SELECT * FROM T"));
        assert!(!is_dsql_query("dsqé:SELECT"));
    }

    #[test]
    fn test_parse_rejects_missing_prefix() {
        let err = parse("SELECT * FROM T").unwrap_err();
        assert!(matches!(err, DsqlError::Usage(_)));
        assert_eq!(err.position(), None);
    }

    #[test]
    fn test_parse_error_has_position() {
        let err = parse("dsql:SELECT FROM T").unwrap_err();
        assert!(matches!(err, DsqlError::Parse(_)));
        // 位置包含 `dsql:` 前缀
        assert_eq!(err.position().map(|p| p.column), Some(13));
    }
}
