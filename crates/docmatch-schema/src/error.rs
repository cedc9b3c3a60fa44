//! Typed errors for schema compilation.

use docmatch_expr::MatchParseError;
use thiserror::Error;

/// Errors raised while compiling a schema document.
///
/// The first error encountered aborts the compilation; no partial trees are
/// returned. Messages name the offending keyword.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A keyword's element carried the wrong tagged type.
    #[error("{0}")]
    TypeMismatch(String),
    /// A keyword's element was well-typed but out of range (empty array,
    /// negative or fractional length, unknown type alias).
    #[error("{0}")]
    BadValue(String),
    /// Structural problem: unknown keyword, duplicate keyword, missing
    /// companion keyword, non-object element in a logical array.
    #[error("{0}")]
    FailedToParse(String),
}

impl From<MatchParseError> for SchemaError {
    fn from(err: MatchParseError) -> Self {
        match err {
            MatchParseError::TypeMismatch(message) => Self::TypeMismatch(message),
            MatchParseError::BadValue(message) => Self::BadValue(message),
            MatchParseError::FailedToParse(message) => Self::FailedToParse(message),
        }
    }
}
