//! The match-expression tree: node variants, evaluation, canonical
//! serialization, and structural equivalence.

use std::cmp::Ordering;

use crate::allowed_properties::AllowedProperties;
use crate::pattern::Pattern;
use crate::value::{Document, Path, TypeSpec, Value};

/// Comparison operator for range restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CmpOp {
    pub fn name(self) -> &'static str {
        match self {
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
        }
    }
}

/// Which end of a string-length interval a [`MatchExpr::StrLength`] node pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthBound {
    Min,
    Max,
}

impl LengthBound {
    pub fn name(self) -> &'static str {
        match self {
            Self::Min => "$_internalSchemaMinLength",
            Self::Max => "$_internalSchemaMaxLength",
        }
    }
}

/// A node in the compiled boolean expression tree.
///
/// Trees are immutable after construction; children are owned and cloning
/// deep-copies the whole subtree. Evaluation never fails and never mutates.
#[derive(Debug, Clone)]
pub enum MatchExpr {
    AlwaysTrue,
    AlwaysFalse,
    And(Vec<MatchExpr>),
    Or(Vec<MatchExpr>),
    Not(Box<MatchExpr>),
    /// Exactly one child matches.
    Xor(Vec<MatchExpr>),
    Exists(Path),
    Type(Path, TypeSpec),
    Comparison(Path, CmpOp, Value),
    Regex(Path, Pattern),
    StrLength(Path, LengthBound, u64),
    /// Applies the inner expression to the sub-document at `path`; fails when
    /// the path is absent or not an object.
    ObjectMatch(Path, Box<MatchExpr>),
    AllowedProperties(AllowedProperties),
}

impl MatchExpr {
    /// Evaluates this expression against a whole document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Self::AlwaysTrue => true,
            Self::AlwaysFalse => false,
            Self::And(children) => children.iter().all(|child| child.matches(doc)),
            Self::Or(children) => children.iter().any(|child| child.matches(doc)),
            Self::Not(child) => !child.matches(doc),
            Self::Xor(children) => {
                children.iter().filter(|child| child.matches(doc)).count() == 1
            }
            Self::Exists(path) => doc.lookup(path).is_some(),
            Self::Type(path, spec) => doc
                .lookup(path)
                .is_some_and(|value| spec.matches(value.tag())),
            Self::Comparison(path, op, operand) => doc
                .lookup(path)
                .is_some_and(|value| compare_values(*op, value, operand)),
            Self::Regex(path, pattern) => doc
                .lookup(path)
                .is_some_and(|value| regex_matches(pattern, value)),
            Self::StrLength(path, bound, len) => doc
                .lookup(path)
                .is_some_and(|value| str_length_matches(*bound, *len, value)),
            Self::ObjectMatch(path, inner) => match doc.lookup(path) {
                Some(Value::Object(sub)) => inner.matches(sub),
                _ => false,
            },
            Self::AllowedProperties(node) => node.matches_fields(doc),
        }
    }

    /// Evaluates this expression against a single tagged value.
    ///
    /// Path-anchored leaves apply their predicate to `value` directly; this
    /// is the surface placeholder sub-expressions are evaluated through.
    pub fn matches_value(&self, value: &Value) -> bool {
        match self {
            Self::AlwaysTrue => true,
            Self::AlwaysFalse => false,
            Self::And(children) => children.iter().all(|child| child.matches_value(value)),
            Self::Or(children) => children.iter().any(|child| child.matches_value(value)),
            Self::Not(child) => !child.matches_value(value),
            Self::Xor(children) => {
                children
                    .iter()
                    .filter(|child| child.matches_value(value))
                    .count()
                    == 1
            }
            Self::Exists(_) => true,
            Self::Type(_, spec) => spec.matches(value.tag()),
            Self::Comparison(_, op, operand) => compare_values(*op, value, operand),
            Self::Regex(_, pattern) => regex_matches(pattern, value),
            Self::StrLength(_, bound, len) => str_length_matches(*bound, *len, value),
            Self::ObjectMatch(_, inner) => match value {
                Value::Object(sub) => inner.matches(sub),
                _ => false,
            },
            Self::AllowedProperties(node) => node.matches_value(value),
        }
    }

    /// Emits the canonical serialized form. The result parses back into an
    /// equivalent tree via [`crate::parser::parse_match`].
    pub fn serialize(&self) -> Document {
        match self {
            Self::AlwaysTrue => single("$alwaysTrue", Value::Int32(1)),
            Self::AlwaysFalse => single("$alwaysFalse", Value::Int32(1)),
            Self::And(children) => single("$and", serialize_children(children)),
            Self::Or(children) => single("$or", serialize_children(children)),
            Self::Not(child) => single("$not", Value::Object(child.serialize())),
            Self::Xor(children) => {
                single("$_internalSchemaXor", serialize_children(children))
            }
            Self::Exists(path) => anchored(path, "$exists", Value::Bool(true)),
            Self::Type(path, spec) => {
                anchored(path, "$type", Value::Str(spec.alias().into()))
            }
            Self::Comparison(path, op, operand) => anchored(path, op.name(), operand.clone()),
            Self::Regex(path, pattern) => anchored(
                path,
                "$regex",
                Value::Regex {
                    pattern: pattern.source().into(),
                    options: String::new(),
                },
            ),
            Self::StrLength(path, bound, len) => {
                anchored(path, bound.name(), Value::Int64(*len as i64))
            }
            Self::ObjectMatch(path, inner) => anchored(
                path,
                "$_internalSchemaObjectMatch",
                Value::Object(inner.serialize()),
            ),
            Self::AllowedProperties(node) => node.serialize(),
        }
    }

    /// Structural equivalence.
    ///
    /// List children compare pairwise in order; the `AllowedProperties`
    /// variant applies its own order-insensitive rules.
    pub fn equivalent(&self, other: &MatchExpr) -> bool {
        match (self, other) {
            (Self::AlwaysTrue, Self::AlwaysTrue) => true,
            (Self::AlwaysFalse, Self::AlwaysFalse) => true,
            (Self::And(a), Self::And(b))
            | (Self::Or(a), Self::Or(b))
            | (Self::Xor(a), Self::Xor(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(left, right)| left.equivalent(right))
            }
            (Self::Not(a), Self::Not(b)) => a.equivalent(b),
            (Self::Exists(a), Self::Exists(b)) => a == b,
            (Self::Type(pa, sa), Self::Type(pb, sb)) => pa == pb && sa == sb,
            (Self::Comparison(pa, oa, va), Self::Comparison(pb, ob, vb)) => {
                pa == pb && oa == ob && va == vb
            }
            (Self::Regex(pa, ra), Self::Regex(pb, rb)) => pa == pb && ra == rb,
            (Self::StrLength(pa, ba, la), Self::StrLength(pb, bb, lb)) => {
                pa == pb && ba == bb && la == lb
            }
            (Self::ObjectMatch(pa, ia), Self::ObjectMatch(pb, ib)) => {
                pa == pb && ia.equivalent(ib)
            }
            (Self::AllowedProperties(a), Self::AllowedProperties(b)) => a.equivalent(b),
            _ => false,
        }
    }
}

fn single(name: &str, value: Value) -> Document {
    let mut doc = Document::new();
    doc.push(name, value);
    doc
}

fn anchored(path: &Path, op: &str, operand: Value) -> Document {
    single(path.as_str(), Value::Object(single(op, operand)))
}

fn serialize_children(children: &[MatchExpr]) -> Value {
    Value::Array(
        children
            .iter()
            .map(|child| Value::Object(child.serialize()))
            .collect(),
    )
}

/// Type-bracketed comparison: numerics compare with numerics (integer pairs
/// exactly, otherwise as doubles), strings with strings, nothing else.
fn compare_values(op: CmpOp, candidate: &Value, operand: &Value) -> bool {
    let ordering = match (candidate.as_i64_exact(), operand.as_i64_exact()) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => match (candidate, operand) {
            (Value::Str(a), Value::Str(b)) => a.as_str().cmp(b.as_str()),
            _ => match (candidate.as_f64(), operand.as_f64()) {
                (Some(a), Some(b)) => match a.partial_cmp(&b) {
                    Some(ordering) => ordering,
                    None => return false,
                },
                _ => return false,
            },
        },
    };
    match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Lte => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Gte => ordering != Ordering::Less,
    }
}

fn regex_matches(pattern: &Pattern, value: &Value) -> bool {
    match value {
        Value::Str(text) => pattern.is_match(text),
        _ => false,
    }
}

fn str_length_matches(bound: LengthBound, len: u64, value: &Value) -> bool {
    match value {
        Value::Str(text) => {
            let chars = text.chars().count() as u64;
            match bound {
                LengthBound::Min => chars >= len,
                LengthBound::Max => chars <= len,
            }
        }
        _ => false,
    }
}
