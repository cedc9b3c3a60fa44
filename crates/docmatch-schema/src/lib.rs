//! Schema-to-match-expression compiler.
//!
//! Translates a declarative, JSON-Schema-like dialect into a
//! [`docmatch_expr::MatchExpr`] tree. Restriction keywords compile to a
//! permissive form (a type mismatch passes instead of failing), matching the
//! schema dialect's semantics rather than the match language's.

pub mod compiler;
pub mod error;
mod keywords;
mod restriction;

pub use compiler::compile;
pub use error::SchemaError;
