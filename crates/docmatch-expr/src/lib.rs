//! Match-expression library for ordered, type-tagged documents.
//!
//! The tree of [`MatchExpr`] nodes is built either programmatically, by the
//! match-dialect parser in [`parser`], or by the schema compiler in the
//! `docmatch-schema` crate. Trees are immutable, evaluate without failing,
//! serialize to a canonical document form, and compare structurally.

pub mod allowed_properties;
pub mod error;
pub mod expr;
pub mod parser;
pub mod pattern;
pub mod value;

pub use allowed_properties::{AllowedProperties, Otherwise, ALLOWED_PROPERTIES_NAME};
pub use error::MatchParseError;
pub use expr::{CmpOp, LengthBound, MatchExpr};
pub use parser::parse_match;
pub use pattern::Pattern;
pub use value::{
    integer_from_value, Document, IntegerError, Path, TypeSpec, TypeTag, Value,
};
