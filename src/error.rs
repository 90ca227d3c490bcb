use thiserror::Error;

use crate::lexer::LexError;
use crate::parser::ParseError;
use crate::query::BuildError;

/// Every way turning DSQL text into a [`Query`](crate::query::Query) can fail.
///
/// All of them are fatal: no partial query is ever produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DsqlError {
    #[error("Usage Error: {0}")]
    Usage(String),

    #[error("Lexical Error: {0}")]
    Lexical(#[from] LexError),

    #[error("Parse Error: {0}")]
    Parse(#[from] ParseError),

    #[error("Build Error: {0}")]
    Build(#[from] BuildError),
}

impl DsqlError {
    /// Line and column of the failure, when the phase that raised it knows them.
    pub fn position(&self) -> Option<crate::token::Position> {
        match self {
            DsqlError::Lexical(e) => Some(e.position),
            DsqlError::Parse(e) => e.position,
            DsqlError::Usage(_) | DsqlError::Build(_) => None,
        }
    }
}
