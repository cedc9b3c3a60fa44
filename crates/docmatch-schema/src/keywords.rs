//! One parser per recognized schema keyword.
//!
//! Every parser receives the path the schema applies at, the keyword's
//! element, and the schema's stated type (if any), and returns a match
//! subtree or the first error.

use docmatch_expr::{
    integer_from_value, CmpOp, IntegerError, LengthBound, MatchExpr, Path, Pattern, TypeSpec,
    TypeTag, Value,
};

use crate::compiler::parse_schema;
use crate::error::SchemaError;
use crate::restriction::make_restriction;

/// Resolves the `type` keyword to a [`TypeSpec`].
pub(crate) fn parse_type(element: &Value) -> Result<TypeSpec, SchemaError> {
    let Value::Str(alias) = element else {
        return Err(SchemaError::TypeMismatch(
            "schema keyword 'type' must be a string".into(),
        ));
    };
    TypeSpec::from_alias(alias).ok_or_else(|| {
        SchemaError::BadValue(format!(
            "unknown type alias '{alias}' for schema keyword 'type'"
        ))
    })
}

pub(crate) fn parse_maximum(
    path: &Path,
    maximum: &Value,
    stated_type: Option<TypeSpec>,
    is_exclusive: bool,
) -> Result<MatchExpr, SchemaError> {
    if !maximum.is_numeric() {
        return Err(SchemaError::TypeMismatch(
            "schema keyword 'maximum' must be a number".into(),
        ));
    }

    if path.is_root() {
        // No effect in a top-level schema: only objects are stored.
        return Ok(MatchExpr::AlwaysTrue);
    }

    let op = if is_exclusive { CmpOp::Lt } else { CmpOp::Lte };
    let expr = MatchExpr::Comparison(path.clone(), op, maximum.clone());
    Ok(make_restriction(TypeSpec::AnyNumber, path, expr, stated_type))
}

pub(crate) fn parse_minimum(
    path: &Path,
    minimum: &Value,
    stated_type: Option<TypeSpec>,
    is_exclusive: bool,
) -> Result<MatchExpr, SchemaError> {
    if !minimum.is_numeric() {
        return Err(SchemaError::TypeMismatch(
            "schema keyword 'minimum' must be a number".into(),
        ));
    }

    if path.is_root() {
        return Ok(MatchExpr::AlwaysTrue);
    }

    let op = if is_exclusive { CmpOp::Gt } else { CmpOp::Gte };
    let expr = MatchExpr::Comparison(path.clone(), op, minimum.clone());
    Ok(make_restriction(TypeSpec::AnyNumber, path, expr, stated_type))
}

pub(crate) fn parse_str_length(
    path: &Path,
    element: &Value,
    stated_type: Option<TypeSpec>,
    bound: LengthBound,
    keyword: &str,
) -> Result<MatchExpr, SchemaError> {
    if !element.is_numeric() {
        return Err(SchemaError::TypeMismatch(format!(
            "schema keyword '{keyword}' must be a number"
        )));
    }

    let len = integer_from_value(element).map_err(|err| match err {
        IntegerError::NotANumber => SchemaError::TypeMismatch(format!(
            "schema keyword '{keyword}' must be a number"
        )),
        IntegerError::Negative | IntegerError::Fractional => SchemaError::BadValue(format!(
            "schema keyword '{keyword}' must be a non-negative integer"
        )),
    })?;

    if path.is_root() {
        return Ok(MatchExpr::AlwaysTrue);
    }

    let expr = MatchExpr::StrLength(path.clone(), bound, len);
    Ok(make_restriction(
        TypeSpec::Tag(TypeTag::Str),
        path,
        expr,
        stated_type,
    ))
}

pub(crate) fn parse_pattern(
    path: &Path,
    pattern: &Value,
    stated_type: Option<TypeSpec>,
) -> Result<MatchExpr, SchemaError> {
    let Value::Str(source) = pattern else {
        return Err(SchemaError::TypeMismatch(
            "schema keyword 'pattern' must be a string".into(),
        ));
    };

    if path.is_root() {
        return Ok(MatchExpr::AlwaysTrue);
    }

    // The dialect does not allow regex flags.
    let expr = MatchExpr::Regex(path.clone(), Pattern::new(source.clone())?);
    Ok(make_restriction(
        TypeSpec::Tag(TypeTag::Str),
        path,
        expr,
        stated_type,
    ))
}

pub(crate) fn parse_properties(
    path: &Path,
    properties: &Value,
    stated_type: Option<TypeSpec>,
) -> Result<MatchExpr, SchemaError> {
    let Value::Object(entries) = properties else {
        return Err(SchemaError::TypeMismatch(
            "schema keyword 'properties' must be an object".into(),
        ));
    };

    let mut conjuncts = Vec::with_capacity(entries.len());
    for (name, sub_schema) in entries {
        let Value::Object(sub_schema) = sub_schema else {
            return Err(SchemaError::TypeMismatch(format!(
                "nested schema for property '{name}' must be an object"
            )));
        };
        conjuncts.push(parse_schema(&Path::field(name.clone()), sub_schema)?);
    }
    let and = MatchExpr::And(conjuncts);

    // A top-level schema needs no explicit object-match node.
    if path.is_root() {
        return Ok(and);
    }

    let object_match = MatchExpr::ObjectMatch(path.clone(), Box::new(and));
    Ok(make_restriction(
        TypeSpec::Tag(TypeTag::Object),
        path,
        object_match,
        stated_type,
    ))
}

/// Which of the array-combinator keywords is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogicalKeyword {
    AllOf,
    AnyOf,
    OneOf,
}

impl LogicalKeyword {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
        }
    }

    fn combine(self, children: Vec<MatchExpr>) -> MatchExpr {
        match self {
            Self::AllOf => MatchExpr::And(children),
            Self::AnyOf => MatchExpr::Or(children),
            Self::OneOf => MatchExpr::Xor(children),
        }
    }
}

pub(crate) fn parse_logical(
    path: &Path,
    element: &Value,
    stated_type: Option<TypeSpec>,
    keyword: LogicalKeyword,
) -> Result<MatchExpr, SchemaError> {
    let Value::Array(items) = element else {
        return Err(SchemaError::TypeMismatch(format!(
            "schema keyword '{}' must be an array",
            keyword.name()
        )));
    };
    if items.is_empty() {
        return Err(SchemaError::BadValue(format!(
            "schema keyword '{}' must be a nonempty array",
            keyword.name()
        )));
    }

    let mut children = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(sub_schema) = item else {
            return Err(SchemaError::FailedToParse(format!(
                "schema keyword '{}' must be an array of objects, but found an element of type {}",
                keyword.name(),
                item.tag()
            )));
        };
        // Array iteration yields indexed field names, which become the
        // sub-schema's path.
        children.push(parse_schema(&Path::field(index.to_string()), sub_schema)?);
    }
    let combined = keyword.combine(children);

    if path.is_root() {
        return Ok(combined);
    }

    let object_match = MatchExpr::ObjectMatch(path.clone(), Box::new(combined));
    Ok(make_restriction(
        TypeSpec::Tag(TypeTag::Object),
        path,
        object_match,
        stated_type,
    ))
}

pub(crate) fn parse_not(
    path: &Path,
    element: &Value,
    stated_type: Option<TypeSpec>,
) -> Result<MatchExpr, SchemaError> {
    let Value::Object(sub_schema) = element else {
        return Err(SchemaError::FailedToParse(format!(
            "schema keyword 'not' must be an object, but found an element of type {}",
            element.tag()
        )));
    };

    let inner = parse_schema(&Path::field("not"), sub_schema)?;
    let negated = MatchExpr::Not(Box::new(inner));

    if path.is_root() {
        return Ok(negated);
    }

    let object_match = MatchExpr::ObjectMatch(path.clone(), Box::new(negated));
    Ok(make_restriction(
        TypeSpec::Tag(TypeTag::Object),
        path,
        object_match,
        stated_type,
    ))
}
