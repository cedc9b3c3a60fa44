//! Wrappers reconciling schema semantics with match-node semantics.
//!
//! Restriction keywords are no-ops on fields of a different type, while the
//! type-anchored match nodes reject such fields outright. These helpers embed
//! a restriction node in the algebra that restores the permissive reading.

use docmatch_expr::{MatchExpr, Path, TypeSpec};

/// Lifts a type-specific restriction into its schema-permissive form:
/// "either the field is not of `restriction_type`, or it satisfies
/// `restriction_expr`".
///
/// When the schema's stated type is incompatible with `restriction_type` the
/// restriction can never apply, and the whole clause collapses to
/// [`MatchExpr::AlwaysTrue`].
pub(crate) fn make_restriction(
    restriction_type: TypeSpec,
    path: &Path,
    restriction_expr: MatchExpr,
    stated_type: Option<TypeSpec>,
) -> MatchExpr {
    if let Some(stated) = stated_type {
        let compatible = match (restriction_type, stated) {
            (TypeSpec::AnyNumber, stated) => stated.is_numeric(),
            (TypeSpec::Tag(restriction), TypeSpec::Tag(stated)) => restriction == stated,
            (TypeSpec::Tag(_), TypeSpec::AnyNumber) => false,
        };
        if !compatible {
            return MatchExpr::AlwaysTrue;
        }
    }

    MatchExpr::Or(vec![
        MatchExpr::Not(Box::new(MatchExpr::Type(path.clone(), restriction_type))),
        restriction_expr,
    ])
}

/// Builds the clause for a stated type on a nested field: "either the field
/// is absent or it has the stated type".
///
/// `path` must be non-empty; the top-level case is handled by the compiler's
/// non-object short-circuit instead.
pub(crate) fn make_type_restriction(path: &Path, stated_type: TypeSpec) -> MatchExpr {
    debug_assert!(!path.is_root());
    MatchExpr::Or(vec![
        MatchExpr::Not(Box::new(MatchExpr::Exists(path.clone()))),
        MatchExpr::Type(path.clone(), stated_type),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmatch_expr::{CmpOp, Document, TypeTag, Value};
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Document {
        Document::from_json(&json).expect("test document must be a JSON object")
    }

    fn lte_five(path: &Path) -> MatchExpr {
        MatchExpr::Comparison(path.clone(), CmpOp::Lte, Value::Int32(5))
    }

    #[test]
    fn wraps_restriction_in_or_not_type() {
        let path = Path::field("a");
        let expr = make_restriction(TypeSpec::AnyNumber, &path, lte_five(&path), None);
        // Non-numeric and absent fields pass; numeric fields must satisfy
        // the restriction.
        assert!(expr.matches(&doc(json!({"a": "text"}))));
        assert!(expr.matches(&doc(json!({}))));
        assert!(expr.matches(&doc(json!({"a": 3}))));
        assert!(!expr.matches(&doc(json!({"a": 9}))));
    }

    #[test]
    fn compatible_stated_type_keeps_the_restriction() {
        let path = Path::field("a");
        for stated in [
            TypeSpec::AnyNumber,
            TypeSpec::Tag(TypeTag::Int),
            TypeSpec::Tag(TypeTag::Long),
            TypeSpec::Tag(TypeTag::Double),
        ] {
            let expr =
                make_restriction(TypeSpec::AnyNumber, &path, lte_five(&path), Some(stated));
            assert!(!expr.matches(&doc(json!({"a": 9}))), "stated {stated:?}");
        }
    }

    #[test]
    fn incompatible_stated_type_collapses_to_always_true() {
        let path = Path::field("a");
        let expr = make_restriction(
            TypeSpec::AnyNumber,
            &path,
            lte_five(&path),
            Some(TypeSpec::Tag(TypeTag::Str)),
        );
        assert!(expr.equivalent(&MatchExpr::AlwaysTrue));

        // A string restriction under a numeric stated type is just as vacuous.
        let expr = make_restriction(
            TypeSpec::Tag(TypeTag::Str),
            &path,
            MatchExpr::StrLength(path.clone(), docmatch_expr::LengthBound::Max, 5),
            Some(TypeSpec::AnyNumber),
        );
        assert!(expr.equivalent(&MatchExpr::AlwaysTrue));
    }

    #[test]
    fn matching_concrete_tags_keep_the_restriction() {
        let path = Path::field("a");
        let expr = make_restriction(
            TypeSpec::Tag(TypeTag::Str),
            &path,
            MatchExpr::StrLength(path.clone(), docmatch_expr::LengthBound::Max, 2),
            Some(TypeSpec::Tag(TypeTag::Str)),
        );
        assert!(!expr.matches(&doc(json!({"a": "long"}))));
        assert!(expr.matches(&doc(json!({"a": "ok"}))));
    }

    #[test]
    fn type_restriction_admits_absent_fields() {
        let expr = make_type_restriction(&Path::field("a"), TypeSpec::Tag(TypeTag::Str));
        assert!(expr.matches(&doc(json!({}))));
        assert!(expr.matches(&doc(json!({"a": "s"}))));
        assert!(!expr.matches(&doc(json!({"a": 1}))));
    }
}
