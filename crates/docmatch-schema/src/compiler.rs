//! Top-level recursive schema compiler.
//!
//! A schema document maps recognized keywords to elements; each keyword
//! contributes one conjunct to the compiled tree. The path threaded through
//! the recursion decides whether restrictions anchor to a field or fold away
//! at the top level.

use std::collections::HashMap;

use docmatch_expr::{Document, LengthBound, MatchExpr, Path, TypeSpec, TypeTag, Value};

use crate::error::SchemaError;
use crate::keywords::{
    parse_logical, parse_maximum, parse_minimum, parse_not, parse_pattern, parse_properties,
    parse_str_length, parse_type, LogicalKeyword,
};
use crate::restriction::make_type_restriction;

const RECOGNIZED_KEYWORDS: [&str; 13] = [
    "type",
    "properties",
    "maximum",
    "minimum",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
];

/// Compiles a schema document into a match-expression tree.
pub fn compile(schema: &Document) -> Result<MatchExpr, SchemaError> {
    parse_schema(&Path::root(), schema)
}

pub(crate) fn parse_schema(path: &Path, schema: &Document) -> Result<MatchExpr, SchemaError> {
    // Keyword -> element map. The document shape forbids duplicates, but the
    // check is cheap and the error is better here than downstream.
    let mut keywords: HashMap<&str, &Value> = HashMap::with_capacity(schema.len());
    for (name, element) in schema {
        if !RECOGNIZED_KEYWORDS.contains(&name.as_str()) {
            return Err(SchemaError::FailedToParse(format!(
                "unknown schema keyword: {name}"
            )));
        }
        if keywords.insert(name.as_str(), element).is_some() {
            return Err(SchemaError::FailedToParse(format!(
                "duplicate schema keyword: {name}"
            )));
        }
    }

    let stated_type = match keywords.get("type") {
        Some(element) => Some(parse_type(element)?),
        None => None,
    };

    let mut conjuncts = Vec::new();

    if let Some(element) = keywords.get("properties") {
        conjuncts.push(parse_properties(path, element, stated_type)?);
    }

    if let Some(element) = keywords.get("maximum") {
        let is_exclusive = exclusivity_flag(&keywords, "exclusiveMaximum")?;
        conjuncts.push(parse_maximum(path, element, stated_type, is_exclusive)?);
    } else if keywords.contains_key("exclusiveMaximum") {
        return Err(SchemaError::FailedToParse(
            "schema keyword 'maximum' must be present if 'exclusiveMaximum' is present".into(),
        ));
    }

    if let Some(element) = keywords.get("minimum") {
        let is_exclusive = exclusivity_flag(&keywords, "exclusiveMinimum")?;
        conjuncts.push(parse_minimum(path, element, stated_type, is_exclusive)?);
    } else if keywords.contains_key("exclusiveMinimum") {
        return Err(SchemaError::FailedToParse(
            "schema keyword 'minimum' must be present if 'exclusiveMinimum' is present".into(),
        ));
    }

    if let Some(element) = keywords.get("maxLength") {
        conjuncts.push(parse_str_length(
            path,
            element,
            stated_type,
            LengthBound::Max,
            "maxLength",
        )?);
    }

    if let Some(element) = keywords.get("minLength") {
        conjuncts.push(parse_str_length(
            path,
            element,
            stated_type,
            LengthBound::Min,
            "minLength",
        )?);
    }

    if let Some(element) = keywords.get("pattern") {
        conjuncts.push(parse_pattern(path, element, stated_type)?);
    }

    for keyword in [
        LogicalKeyword::AllOf,
        LogicalKeyword::AnyOf,
        LogicalKeyword::OneOf,
    ] {
        if let Some(element) = keywords.get(keyword.name()) {
            conjuncts.push(parse_logical(path, element, stated_type, keyword)?);
        }
    }

    if let Some(element) = keywords.get("not") {
        conjuncts.push(parse_not(path, element, stated_type)?);
    }

    if path.is_root() {
        if let Some(stated) = stated_type {
            if stated != TypeSpec::Tag(TypeTag::Object) {
                // Only objects are stored at the top level; a schema pinning
                // any other type matches nothing.
                return Ok(MatchExpr::AlwaysFalse);
            }
        }
    } else if let Some(stated) = stated_type {
        conjuncts.push(make_type_restriction(path, stated));
    }

    Ok(MatchExpr::And(conjuncts))
}

fn exclusivity_flag(
    keywords: &HashMap<&str, &Value>,
    companion: &str,
) -> Result<bool, SchemaError> {
    match keywords.get(companion) {
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(_) => Err(SchemaError::TypeMismatch(format!(
            "schema keyword '{companion}' must be a boolean"
        ))),
        None => Ok(false),
    }
}
