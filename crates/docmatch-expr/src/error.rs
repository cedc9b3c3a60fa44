//! Error types for the match dialect.

use thiserror::Error;

/// Errors raised while parsing the canonical match dialect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchParseError {
    /// Structural problem: unknown operator, malformed clause shape,
    /// placeholder violation.
    #[error("{0}")]
    FailedToParse(String),
    /// An operand carried the wrong tagged type.
    #[error("{0}")]
    TypeMismatch(String),
    /// An operand was well-typed but out of range or otherwise unusable.
    #[error("{0}")]
    BadValue(String),
}
