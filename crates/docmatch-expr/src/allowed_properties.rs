//! Per-property validator combining a literal allow-list, ordered pattern
//! clauses, and a fallback clause.

use std::collections::BTreeSet;

use crate::expr::MatchExpr;
use crate::pattern::Pattern;
use crate::value::{Document, Value};

/// The operator name this node serializes under.
pub const ALLOWED_PROPERTIES_NAME: &str = "$_internalSchemaAllowedProperties";

/// Fallback clause for fields matched by neither the literal allow-list nor
/// any pattern clause.
#[derive(Debug, Clone)]
pub enum Otherwise {
    /// Evaluate the expression against the field's value.
    Expression(Box<MatchExpr>),
    /// Accept (`true`) or reject (`false`) the field outright.
    Bool(bool),
}

/// A match node validating every field of an object.
///
/// Each field is checked against the literal `properties` set and, always,
/// against every pattern clause whose regex matches the field name; a literal
/// hit does not shield the field from pattern sub-expressions. Fields hit by
/// neither fall through to `otherwise`.
#[derive(Debug, Clone)]
pub struct AllowedProperties {
    properties: BTreeSet<String>,
    name_placeholder: String,
    pattern_properties: Vec<(Pattern, MatchExpr)>,
    otherwise: Otherwise,
}

impl AllowedProperties {
    /// Builds a node. `name_placeholder` must be non-empty whenever
    /// `pattern_properties` is non-empty or `otherwise` is an expression;
    /// the dialect parser enforces this with a typed error.
    pub fn new(
        properties: BTreeSet<String>,
        name_placeholder: impl Into<String>,
        pattern_properties: Vec<(Pattern, MatchExpr)>,
        otherwise: Otherwise,
    ) -> Self {
        let name_placeholder = name_placeholder.into();
        debug_assert!(
            !name_placeholder.is_empty()
                || (pattern_properties.is_empty() && matches!(otherwise, Otherwise::Bool(_)))
        );
        Self {
            properties,
            name_placeholder,
            pattern_properties,
            otherwise,
        }
    }

    pub fn properties(&self) -> &BTreeSet<String> {
        &self.properties
    }

    pub fn name_placeholder(&self) -> &str {
        &self.name_placeholder
    }

    pub fn pattern_properties(&self) -> &[(Pattern, MatchExpr)] {
        &self.pattern_properties
    }

    pub fn otherwise(&self) -> &Otherwise {
        &self.otherwise
    }

    /// Runs the per-field loop over a document's fields.
    pub(crate) fn matches_fields(&self, doc: &Document) -> bool {
        for (name, value) in doc {
            let mut check_otherwise = true;

            if self.properties.contains(name) {
                check_otherwise = false;
            }

            for (pattern, sub_expr) in &self.pattern_properties {
                if pattern.is_match(name) {
                    check_otherwise = false;
                    if !sub_expr.matches_value(value) {
                        return false;
                    }
                }
            }

            if check_otherwise {
                match &self.otherwise {
                    Otherwise::Expression(sub_expr) => {
                        if !sub_expr.matches_value(value) {
                            return false;
                        }
                    }
                    Otherwise::Bool(false) => return false,
                    Otherwise::Bool(true) => {}
                }
            }
        }
        true
    }

    /// Evaluates against a single value: objects run the field loop, every
    /// other tag (arrays included) is rejected.
    pub fn matches_value(&self, value: &Value) -> bool {
        match value {
            Value::Object(doc) => self.matches_fields(doc),
            _ => false,
        }
    }

    /// Canonical serialized form:
    /// `{$_internalSchemaAllowedProperties: {properties, namePlaceholder,
    /// patternProperties, otherwise}}`.
    pub fn serialize(&self) -> Document {
        let mut body = Document::new();
        body.push(
            "properties",
            Value::Array(
                self.properties
                    .iter()
                    .map(|name| Value::Str(name.clone()))
                    .collect(),
            ),
        );
        body.push(
            "namePlaceholder",
            Value::Str(self.name_placeholder.clone()),
        );
        body.push(
            "patternProperties",
            Value::Array(
                self.pattern_properties
                    .iter()
                    .map(|(pattern, sub_expr)| {
                        let mut clause = Document::new();
                        clause.push(
                            "regex",
                            Value::Regex {
                                pattern: pattern.source().into(),
                                options: String::new(),
                            },
                        );
                        clause.push("expression", Value::Object(sub_expr.serialize()));
                        Value::Object(clause)
                    })
                    .collect(),
            ),
        );
        match &self.otherwise {
            Otherwise::Expression(sub_expr) => {
                body.push("otherwise", Value::Object(sub_expr.serialize()));
            }
            Otherwise::Bool(value) => body.push("otherwise", Value::Bool(*value)),
        }

        let mut out = Document::new();
        out.push(ALLOWED_PROPERTIES_NAME, Value::Object(body));
        out
    }

    /// Structural equivalence: equal property sets, equal placeholders,
    /// matching fallback, and pattern clauses equal up to permutation under
    /// (source regex, equivalent sub-expression).
    pub fn equivalent(&self, other: &AllowedProperties) -> bool {
        if self.properties != other.properties {
            return false;
        }
        if self.name_placeholder != other.name_placeholder {
            return false;
        }
        match (&self.otherwise, &other.otherwise) {
            (Otherwise::Expression(a), Otherwise::Expression(b)) => {
                if !a.equivalent(b) {
                    return false;
                }
            }
            (Otherwise::Bool(a), Otherwise::Bool(b)) => {
                if a != b {
                    return false;
                }
            }
            _ => return false,
        }
        clauses_are_permutation(&self.pattern_properties, &other.pattern_properties)
    }
}

fn clauses_are_permutation(
    left: &[(Pattern, MatchExpr)],
    right: &[(Pattern, MatchExpr)],
) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut used = vec![false; right.len()];
    'clauses: for (pattern, sub_expr) in left {
        for (i, (other_pattern, other_sub)) in right.iter().enumerate() {
            if !used[i] && pattern == other_pattern && sub_expr.equivalent(other_sub) {
                used[i] = true;
                continue 'clauses;
            }
        }
        return false;
    }
    true
}
