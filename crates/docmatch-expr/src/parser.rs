//! Parser for the canonical match dialect.
//!
//! Accepts exactly the language [`MatchExpr::serialize`] emits, so a
//! serialized tree re-parses into an equivalent tree.

use std::collections::BTreeSet;

use crate::allowed_properties::{AllowedProperties, Otherwise, ALLOWED_PROPERTIES_NAME};
use crate::error::MatchParseError;
use crate::expr::{CmpOp, LengthBound, MatchExpr};
use crate::pattern::Pattern;
use crate::value::{integer_from_value, Document, IntegerError, Path, TypeSpec, Value};

/// Parses a match-dialect document into an expression tree.
///
/// A document with several top-level fields is an implicit conjunction; the
/// empty document matches everything.
pub fn parse_match(doc: &Document) -> Result<MatchExpr, MatchParseError> {
    let mut children = Vec::with_capacity(doc.len());
    for (name, value) in doc {
        children.push(parse_field(name, value)?);
    }
    if children.len() == 1 {
        Ok(children.remove(0))
    } else {
        Ok(MatchExpr::And(children))
    }
}

fn parse_field(name: &str, value: &Value) -> Result<MatchExpr, MatchParseError> {
    match name {
        "$and" => Ok(MatchExpr::And(parse_expression_array(name, value)?)),
        "$or" => Ok(MatchExpr::Or(parse_expression_array(name, value)?)),
        "$_internalSchemaXor" => Ok(MatchExpr::Xor(parse_expression_array(name, value)?)),
        "$not" => match value {
            Value::Object(inner) => Ok(MatchExpr::Not(Box::new(parse_match(inner)?))),
            _ => Err(MatchParseError::TypeMismatch(format!(
                "operator '{name}' takes an expression document"
            ))),
        },
        "$alwaysTrue" => Ok(MatchExpr::AlwaysTrue),
        "$alwaysFalse" => Ok(MatchExpr::AlwaysFalse),
        ALLOWED_PROPERTIES_NAME => match value {
            Value::Object(body) => parse_allowed_properties(body),
            _ => Err(MatchParseError::TypeMismatch(format!(
                "operator '{name}' takes an object"
            ))),
        },
        _ if name.starts_with('$') => Err(MatchParseError::FailedToParse(format!(
            "unknown top-level operator: {name}"
        ))),
        _ => parse_path_clause(name, value),
    }
}

fn parse_expression_array(
    name: &str,
    value: &Value,
) -> Result<Vec<MatchExpr>, MatchParseError> {
    let Value::Array(items) = value else {
        return Err(MatchParseError::TypeMismatch(format!(
            "operator '{name}' takes an array of expression documents"
        )));
    };
    let mut children = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(doc) = item else {
            return Err(MatchParseError::TypeMismatch(format!(
                "operator '{name}' takes an array of expression documents"
            )));
        };
        children.push(parse_match(doc)?);
    }
    Ok(children)
}

fn parse_path_clause(path_name: &str, value: &Value) -> Result<MatchExpr, MatchParseError> {
    let Value::Object(operators) = value else {
        return Err(MatchParseError::FailedToParse(format!(
            "expected an operator document for path '{path_name}'"
        )));
    };
    if operators.is_empty() {
        return Err(MatchParseError::FailedToParse(format!(
            "expected an operator for path '{path_name}'"
        )));
    }
    let path = Path::field(path_name);
    let mut parsed = Vec::with_capacity(operators.len());
    for (op, operand) in operators {
        parsed.push(parse_operator(&path, op, operand)?);
    }
    if parsed.len() == 1 {
        Ok(parsed.remove(0))
    } else {
        Ok(MatchExpr::And(parsed))
    }
}

fn parse_operator(
    path: &Path,
    op: &str,
    operand: &Value,
) -> Result<MatchExpr, MatchParseError> {
    match op {
        "$exists" => match operand {
            Value::Bool(true) => Ok(MatchExpr::Exists(path.clone())),
            Value::Bool(false) => {
                Ok(MatchExpr::Not(Box::new(MatchExpr::Exists(path.clone()))))
            }
            _ => Err(MatchParseError::TypeMismatch(
                "operator '$exists' takes a boolean".into(),
            )),
        },
        "$type" => match operand {
            Value::Str(alias) => match TypeSpec::from_alias(alias) {
                Some(spec) => Ok(MatchExpr::Type(path.clone(), spec)),
                None => Err(MatchParseError::BadValue(format!(
                    "unknown type alias '{alias}' for operator '$type'"
                ))),
            },
            _ => Err(MatchParseError::TypeMismatch(
                "operator '$type' takes a type alias string".into(),
            )),
        },
        "$lt" | "$lte" | "$gt" | "$gte" => {
            let cmp = match op {
                "$lt" => CmpOp::Lt,
                "$lte" => CmpOp::Lte,
                "$gt" => CmpOp::Gt,
                _ => CmpOp::Gte,
            };
            if !operand.is_numeric() && !matches!(operand, Value::Str(_)) {
                return Err(MatchParseError::TypeMismatch(format!(
                    "operator '{op}' takes a number or a string"
                )));
            }
            Ok(MatchExpr::Comparison(path.clone(), cmp, operand.clone()))
        }
        "$regex" => {
            let source = match operand {
                Value::Regex { pattern, options } => {
                    if !options.is_empty() {
                        return Err(MatchParseError::BadValue(
                            "operator '$regex' does not accept flags".into(),
                        ));
                    }
                    pattern
                }
                Value::Str(pattern) => pattern,
                _ => {
                    return Err(MatchParseError::TypeMismatch(
                        "operator '$regex' takes a regular expression".into(),
                    ))
                }
            };
            Ok(MatchExpr::Regex(path.clone(), Pattern::new(source.clone())?))
        }
        "$_internalSchemaMinLength" | "$_internalSchemaMaxLength" => {
            let bound = if op == "$_internalSchemaMinLength" {
                LengthBound::Min
            } else {
                LengthBound::Max
            };
            let len = integer_from_value(operand).map_err(|err| match err {
                IntegerError::NotANumber => MatchParseError::TypeMismatch(format!(
                    "operator '{op}' takes a number"
                )),
                IntegerError::Negative | IntegerError::Fractional => MatchParseError::BadValue(
                    format!("operator '{op}' takes a non-negative integer"),
                ),
            })?;
            Ok(MatchExpr::StrLength(path.clone(), bound, len))
        }
        "$_internalSchemaObjectMatch" => match operand {
            Value::Object(inner) => Ok(MatchExpr::ObjectMatch(
                path.clone(),
                Box::new(parse_match(inner)?),
            )),
            _ => Err(MatchParseError::TypeMismatch(
                "operator '$_internalSchemaObjectMatch' takes an expression document".into(),
            )),
        },
        _ => Err(MatchParseError::FailedToParse(format!(
            "unknown operator '{op}' for path '{path}'"
        ))),
    }
}

fn parse_allowed_properties(body: &Document) -> Result<MatchExpr, MatchParseError> {
    let mut properties: Option<BTreeSet<String>> = None;
    let mut name_placeholder: Option<String> = None;
    let mut raw_patterns: Option<&Vec<Value>> = None;
    let mut raw_otherwise: Option<&Value> = None;

    for (field, value) in body {
        match field.as_str() {
            "properties" => {
                if properties.is_some() {
                    return Err(duplicate_clause("properties"));
                }
                properties = Some(parse_property_names(value)?);
            }
            "namePlaceholder" => {
                if name_placeholder.is_some() {
                    return Err(duplicate_clause("namePlaceholder"));
                }
                let Value::Str(placeholder) = value else {
                    return Err(MatchParseError::TypeMismatch(
                        "'namePlaceholder' must be a string".into(),
                    ));
                };
                name_placeholder = Some(placeholder.clone());
            }
            "patternProperties" => {
                if raw_patterns.is_some() {
                    return Err(duplicate_clause("patternProperties"));
                }
                let Value::Array(items) = value else {
                    return Err(MatchParseError::TypeMismatch(
                        "'patternProperties' must be an array".into(),
                    ));
                };
                raw_patterns = Some(items);
            }
            "otherwise" => {
                if raw_otherwise.is_some() {
                    return Err(duplicate_clause("otherwise"));
                }
                raw_otherwise = Some(value);
            }
            _ => {
                return Err(MatchParseError::FailedToParse(format!(
                    "unknown '{ALLOWED_PROPERTIES_NAME}' clause: {field}"
                )))
            }
        }
    }

    let name_placeholder = name_placeholder.unwrap_or_default();

    let mut pattern_properties = Vec::new();
    if let Some(items) = raw_patterns {
        for item in items {
            pattern_properties.push(parse_pattern_clause(item, &name_placeholder)?);
        }
    }

    let otherwise = match raw_otherwise {
        None => Otherwise::Bool(true),
        Some(Value::Bool(value)) => Otherwise::Bool(*value),
        Some(Value::Object(doc)) => {
            let sub_expr = parse_placeholder_expression(doc, &name_placeholder)?;
            Otherwise::Expression(Box::new(sub_expr))
        }
        Some(_) => {
            return Err(MatchParseError::TypeMismatch(
                "'otherwise' must be a boolean or an expression document".into(),
            ))
        }
    };

    if name_placeholder.is_empty()
        && (!pattern_properties.is_empty() || matches!(otherwise, Otherwise::Expression(_)))
    {
        return Err(MatchParseError::FailedToParse(format!(
            "'{ALLOWED_PROPERTIES_NAME}' requires a non-empty 'namePlaceholder' \
             when 'patternProperties' or an expression 'otherwise' is present"
        )));
    }

    Ok(MatchExpr::AllowedProperties(AllowedProperties::new(
        properties.unwrap_or_default(),
        name_placeholder,
        pattern_properties,
        otherwise,
    )))
}

fn duplicate_clause(name: &str) -> MatchParseError {
    MatchParseError::FailedToParse(format!(
        "duplicate '{ALLOWED_PROPERTIES_NAME}' clause: {name}"
    ))
}

fn parse_property_names(value: &Value) -> Result<BTreeSet<String>, MatchParseError> {
    let Value::Array(items) = value else {
        return Err(MatchParseError::TypeMismatch(
            "'properties' must be an array of field names".into(),
        ));
    };
    let mut names = BTreeSet::new();
    for item in items {
        let Value::Str(name) = item else {
            return Err(MatchParseError::TypeMismatch(
                "'properties' must be an array of field names".into(),
            ));
        };
        names.insert(name.clone());
    }
    Ok(names)
}

fn parse_pattern_clause(
    item: &Value,
    name_placeholder: &str,
) -> Result<(Pattern, MatchExpr), MatchParseError> {
    let Value::Object(clause) = item else {
        return Err(MatchParseError::TypeMismatch(
            "'patternProperties' entries must be objects".into(),
        ));
    };
    let mut pattern: Option<Pattern> = None;
    let mut expression: Option<MatchExpr> = None;
    for (field, value) in clause {
        match field.as_str() {
            "regex" => match value {
                Value::Regex { pattern: source, options } if options.is_empty() => {
                    pattern = Some(Pattern::new(source.clone())?);
                }
                Value::Regex { .. } => {
                    return Err(MatchParseError::BadValue(
                        "'patternProperties' regexes do not accept flags".into(),
                    ))
                }
                _ => {
                    return Err(MatchParseError::TypeMismatch(
                        "'patternProperties' entries need a 'regex' regular expression".into(),
                    ))
                }
            },
            "expression" => match value {
                Value::Object(doc) => {
                    expression = Some(parse_placeholder_expression(doc, name_placeholder)?);
                }
                _ => {
                    return Err(MatchParseError::TypeMismatch(
                        "'patternProperties' entries need an 'expression' document".into(),
                    ))
                }
            },
            _ => {
                return Err(MatchParseError::FailedToParse(format!(
                    "unknown 'patternProperties' clause: {field}"
                )))
            }
        }
    }
    match (pattern, expression) {
        (Some(pattern), Some(expression)) => Ok((pattern, expression)),
        _ => Err(MatchParseError::FailedToParse(
            "'patternProperties' entries need both 'regex' and 'expression'".into(),
        )),
    }
}

/// Parses a sub-expression bound to the placeholder name: every path in the
/// parsed expression must start with the placeholder.
fn parse_placeholder_expression(
    doc: &Document,
    name_placeholder: &str,
) -> Result<MatchExpr, MatchParseError> {
    let sub_expr = parse_match(doc)?;
    match expression_placeholder(&sub_expr)? {
        Some(found) if found != name_placeholder => Err(MatchParseError::FailedToParse(format!(
            "expected placeholder '{name_placeholder}' but found '{found}'"
        ))),
        _ => Ok(sub_expr),
    }
}

/// The single leading path segment an expression is bound to, if any.
///
/// Logical nodes merge their children's placeholders and error on conflict;
/// expressions with no paths (e.g. `$alwaysTrue`) have none.
fn expression_placeholder(expr: &MatchExpr) -> Result<Option<String>, MatchParseError> {
    match expr {
        MatchExpr::AlwaysTrue | MatchExpr::AlwaysFalse | MatchExpr::AllowedProperties(_) => {
            Ok(None)
        }
        MatchExpr::And(children) | MatchExpr::Or(children) | MatchExpr::Xor(children) => {
            let mut merged: Option<String> = None;
            for child in children {
                merged = merge_placeholders(merged, expression_placeholder(child)?)?;
            }
            Ok(merged)
        }
        MatchExpr::Not(child) => expression_placeholder(child),
        MatchExpr::Exists(path)
        | MatchExpr::Type(path, _)
        | MatchExpr::Comparison(path, _, _)
        | MatchExpr::Regex(path, _)
        | MatchExpr::StrLength(path, _, _)
        | MatchExpr::ObjectMatch(path, _) => Ok(path.head().map(str::to_owned)),
    }
}

fn merge_placeholders(
    left: Option<String>,
    right: Option<String>,
) -> Result<Option<String>, MatchParseError> {
    match (left, right) {
        (Some(a), Some(b)) if a != b => Err(MatchParseError::FailedToParse(format!(
            "expression binds conflicting placeholders '{a}' and '{b}'"
        ))),
        (Some(a), _) => Ok(Some(a)),
        (None, b) => Ok(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Document {
        Document::from_json(&json).expect("test document must be a JSON object")
    }

    fn parse(json: serde_json::Value) -> Result<MatchExpr, MatchParseError> {
        parse_match(&doc(json))
    }

    // -- basic forms --

    #[test]
    fn empty_document_parses_to_empty_conjunction() {
        let expr = parse(json!({})).unwrap();
        assert!(expr.equivalent(&MatchExpr::And(vec![])));
    }

    #[test]
    fn multiple_top_level_fields_form_a_conjunction() {
        let expr = parse(json!({"a": {"$exists": true}, "b": {"$type": "string"}})).unwrap();
        assert!(matches!(&expr, MatchExpr::And(children) if children.len() == 2));
    }

    #[test]
    fn multiple_operators_on_one_path_form_a_conjunction() {
        let expr = parse(json!({"a": {"$gte": 0, "$lte": 10}})).unwrap();
        assert!(expr.matches(&doc(json!({"a": 5}))));
        assert!(!expr.matches(&doc(json!({"a": 11}))));
        assert!(!expr.matches(&doc(json!({"a": -1}))));
    }

    #[test]
    fn exists_false_parses_to_negated_exists() {
        let expr = parse(json!({"a": {"$exists": false}})).unwrap();
        assert!(expr.matches(&doc(json!({}))));
        assert!(!expr.matches(&doc(json!({"a": 1}))));
    }

    // -- errors --

    #[test]
    fn unknown_top_level_operator_is_rejected() {
        let err = parse(json!({"$frob": 1})).unwrap_err();
        assert!(matches!(err, MatchParseError::FailedToParse(_)));
    }

    #[test]
    fn unknown_path_operator_is_rejected() {
        let err = parse(json!({"a": {"$frob": 1}})).unwrap_err();
        assert!(matches!(err, MatchParseError::FailedToParse(_)));
    }

    #[test]
    fn bare_path_value_is_rejected() {
        // No equality in this dialect; a path needs an operator document.
        let err = parse(json!({"a": 1})).unwrap_err();
        assert!(matches!(err, MatchParseError::FailedToParse(_)));
    }

    #[test]
    fn logical_operators_require_arrays_of_documents() {
        assert!(matches!(
            parse(json!({"$and": 1})).unwrap_err(),
            MatchParseError::TypeMismatch(_)
        ));
        assert!(matches!(
            parse(json!({"$or": [1]})).unwrap_err(),
            MatchParseError::TypeMismatch(_)
        ));
    }

    #[test]
    fn type_alias_must_be_known() {
        let err = parse(json!({"a": {"$type": "decimal"}})).unwrap_err();
        assert!(matches!(err, MatchParseError::BadValue(_)));
    }

    #[test]
    fn length_operands_are_validated() {
        assert!(matches!(
            parse(json!({"a": {"$_internalSchemaMaxLength": "x"}})).unwrap_err(),
            MatchParseError::TypeMismatch(_)
        ));
        assert!(matches!(
            parse(json!({"a": {"$_internalSchemaMaxLength": -1}})).unwrap_err(),
            MatchParseError::BadValue(_)
        ));
        assert!(matches!(
            parse(json!({"a": {"$_internalSchemaMinLength": 1.5}})).unwrap_err(),
            MatchParseError::BadValue(_)
        ));
    }

    #[test]
    fn regex_flags_are_rejected() {
        let err = parse(json!({"a": {"$regex":
            {"$regularExpression": {"pattern": "x", "options": "i"}}}}))
        .unwrap_err();
        assert!(matches!(err, MatchParseError::BadValue(_)));
    }

    // -- allowed properties --

    #[test]
    fn allowed_properties_parses_the_canonical_form() {
        let expr = parse(json!({"$_internalSchemaAllowedProperties": {
            "properties": ["a", "b"],
            "namePlaceholder": "i",
            "patternProperties": [{
                "regex": {"$regularExpression": {"pattern": "^x", "options": ""}},
                "expression": {"i": {"$type": "string"}},
            }],
            "otherwise": {"i": {"$type": "string"}},
        }}))
        .unwrap();
        let MatchExpr::AllowedProperties(node) = &expr else {
            panic!("expected an AllowedProperties node");
        };
        assert_eq!(node.name_placeholder(), "i");
        assert_eq!(node.properties().len(), 2);
        assert_eq!(node.pattern_properties().len(), 1);
    }

    #[test]
    fn allowed_properties_defaults_absent_clauses() {
        let expr = parse(json!({"$_internalSchemaAllowedProperties": {
            "otherwise": false,
        }}))
        .unwrap();
        let MatchExpr::AllowedProperties(node) = &expr else {
            panic!("expected an AllowedProperties node");
        };
        assert!(node.properties().is_empty());
        assert!(node.pattern_properties().is_empty());
        assert_eq!(node.name_placeholder(), "");
        assert!(matches!(node.otherwise(), Otherwise::Bool(false)));
    }

    #[test]
    fn allowed_properties_rejects_placeholder_mismatch() {
        let err = parse(json!({"$_internalSchemaAllowedProperties": {
            "namePlaceholder": "i",
            "patternProperties": [{
                "regex": {"$regularExpression": {"pattern": "^x", "options": ""}},
                "expression": {"j": {"$type": "string"}},
            }],
        }}))
        .unwrap_err();
        assert!(matches!(err, MatchParseError::FailedToParse(_)));
    }

    #[test]
    fn allowed_properties_requires_placeholder_for_patterns() {
        let err = parse(json!({"$_internalSchemaAllowedProperties": {
            "patternProperties": [{
                "regex": {"$regularExpression": {"pattern": "^x", "options": ""}},
                "expression": {"$alwaysTrue": 1},
            }],
        }}))
        .unwrap_err();
        assert!(matches!(err, MatchParseError::FailedToParse(_)));
    }

    #[test]
    fn allowed_properties_rejects_unknown_clauses() {
        let err = parse(json!({"$_internalSchemaAllowedProperties": {
            "otherwise": true,
            "extra": 1,
        }}))
        .unwrap_err();
        assert!(matches!(err, MatchParseError::FailedToParse(_)));
    }

    #[test]
    fn placeholder_free_sub_expressions_are_accepted() {
        let expr = parse(json!({"$_internalSchemaAllowedProperties": {
            "namePlaceholder": "i",
            "otherwise": {"$alwaysFalse": 1},
        }}))
        .unwrap();
        let MatchExpr::AllowedProperties(node) = &expr else {
            panic!("expected an AllowedProperties node");
        };
        assert!(matches!(node.otherwise(), Otherwise::Expression(_)));
    }

    // -- round trips --

    #[test]
    fn serialized_trees_reparse_equivalent() {
        let samples = [
            json!({"$and": [{"a": {"$exists": true}}, {"$or": [{"b": {"$lte": 3}}]}]}),
            json!({"$not": {"a": {"$type": "number"}}}),
            json!({"$_internalSchemaXor": [{"a": {"$gt": 0}}, {"b": {"$gt": 0}}]}),
            json!({"a": {"$_internalSchemaObjectMatch": {"b": {"$type": "string"}}}}),
            json!({"s": {"$regex": {"$regularExpression": {"pattern": "^a+", "options": ""}}}}),
            json!({"s": {"$_internalSchemaMinLength": 2}}),
            json!({"$alwaysTrue": 1}),
            json!({"$alwaysFalse": 1}),
            json!({"$_internalSchemaAllowedProperties": {
                "properties": ["a"],
                "namePlaceholder": "i",
                "patternProperties": [{
                    "regex": {"$regularExpression": {"pattern": "^a", "options": ""}},
                    "expression": {"i": {"$type": "string"}},
                }],
                "otherwise": {"i": {"$type": "number"}},
            }}),
        ];
        for sample in samples {
            let expr = parse(sample).unwrap();
            let reparsed = parse_match(&expr.serialize()).unwrap();
            assert!(expr.equivalent(&reparsed));
        }
    }
}
