//! Tagged document values, ordered documents, and type machinery.

use std::fmt;

use serde_json::Value as Json;

/// Discriminator for every value the document model can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Double,
    Str,
    Object,
    Array,
    Bool,
    Null,
    Regex,
    Int,
    Long,
    Date,
}

impl TypeTag {
    /// Returns the alias string used by the `type` keyword and `$type`.
    pub fn alias(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Str => "string",
            Self::Object => "object",
            Self::Array => "array",
            Self::Bool => "bool",
            Self::Null => "null",
            Self::Regex => "regex",
            Self::Int => "int",
            Self::Long => "long",
            Self::Date => "date",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Double | Self::Int | Self::Long)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}

/// A type requirement: one concrete tag, or the "any numeric" predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSpec {
    Tag(TypeTag),
    AnyNumber,
}

impl TypeSpec {
    /// Resolves a `type` alias string. `"number"` maps to [`TypeSpec::AnyNumber`].
    pub fn from_alias(alias: &str) -> Option<Self> {
        if alias == "number" {
            return Some(Self::AnyNumber);
        }
        let tag = match alias {
            "double" => TypeTag::Double,
            "string" => TypeTag::Str,
            "object" => TypeTag::Object,
            "array" => TypeTag::Array,
            "bool" => TypeTag::Bool,
            "null" => TypeTag::Null,
            "regex" => TypeTag::Regex,
            "int" => TypeTag::Int,
            "long" => TypeTag::Long,
            "date" => TypeTag::Date,
            _ => return None,
        };
        Some(Self::Tag(tag))
    }

    pub fn alias(self) -> &'static str {
        match self {
            Self::Tag(tag) => tag.alias(),
            Self::AnyNumber => "number",
        }
    }

    /// Whether a value with the given tag satisfies this spec.
    pub fn matches(self, tag: TypeTag) -> bool {
        match self {
            Self::Tag(expected) => expected == tag,
            Self::AnyNumber => tag.is_numeric(),
        }
    }

    /// True for `AnyNumber` and for any concrete numeric tag.
    pub fn is_numeric(self) -> bool {
        match self {
            Self::Tag(tag) => tag.is_numeric(),
            Self::AnyNumber => true,
        }
    }
}

/// A single tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Double(f64),
    Int32(i32),
    Int64(i64),
    Str(String),
    Bool(bool),
    Null,
    Regex { pattern: String, options: String },
    DateTime(i64),
    Array(Vec<Value>),
    Object(Document),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Double(_) => TypeTag::Double,
            Self::Int32(_) => TypeTag::Int,
            Self::Int64(_) => TypeTag::Long,
            Self::Str(_) => TypeTag::Str,
            Self::Bool(_) => TypeTag::Bool,
            Self::Null => TypeTag::Null,
            Self::Regex { .. } => TypeTag::Regex,
            Self::DateTime(_) => TypeTag::Date,
            Self::Array(_) => TypeTag::Array,
            Self::Object(_) => TypeTag::Object,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.tag().is_numeric()
    }

    /// Numeric payload widened to a double; `None` for non-numeric values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Int32(i) => Some(f64::from(*i)),
            Self::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Exact integer payload; `None` for doubles and non-numeric values.
    pub fn as_i64_exact(&self) -> Option<i64> {
        match self {
            Self::Int32(i) => Some(i64::from(*i)),
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Decodes a `serde_json` value into a tagged value.
    ///
    /// Integer JSON numbers land on `Int32` when they fit, else `Int64`;
    /// all other numbers land on `Double`. Two single-purpose wrappers are
    /// recognized: `{"$regularExpression": {"pattern": p, "options": o}}`
    /// becomes [`Value::Regex`] and `{"$date": millis}` becomes
    /// [`Value::DateTime`]. Malformed wrappers decode structurally.
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if let Ok(small) = i32::try_from(i) {
                        Self::Int32(small)
                    } else {
                        Self::Int64(i)
                    }
                } else {
                    Self::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Self::Str(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => {
                if let Some(regex) = decode_regex_wrapper(map) {
                    return regex;
                }
                if let Some(date) = decode_date_wrapper(map) {
                    return date;
                }
                Self::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Self::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Inverse of [`Value::from_json`].
    pub fn to_json(&self) -> Json {
        match self {
            Self::Double(d) => serde_json::Number::from_f64(*d).map_or(Json::Null, Json::Number),
            Self::Int32(i) => Json::from(*i),
            Self::Int64(i) => Json::from(*i),
            Self::Str(s) => Json::String(s.clone()),
            Self::Bool(b) => Json::Bool(*b),
            Self::Null => Json::Null,
            Self::Regex { pattern, options } => serde_json::json!({
                "$regularExpression": { "pattern": pattern, "options": options }
            }),
            Self::DateTime(millis) => serde_json::json!({ "$date": millis }),
            Self::Array(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(doc) => doc.to_json(),
        }
    }
}

fn decode_regex_wrapper(map: &serde_json::Map<String, Json>) -> Option<Value> {
    if map.len() != 1 {
        return None;
    }
    let Json::Object(inner) = map.get("$regularExpression")? else {
        return None;
    };
    let Json::String(pattern) = inner.get("pattern")? else {
        return None;
    };
    let options = match inner.get("options") {
        Some(Json::String(options)) => options.clone(),
        Some(_) => return None,
        None => String::new(),
    };
    if inner.len() > 2 || (inner.len() == 2 && !inner.contains_key("options")) {
        return None;
    }
    Some(Value::Regex {
        pattern: pattern.clone(),
        options,
    })
}

fn decode_date_wrapper(map: &serde_json::Map<String, Json>) -> Option<Value> {
    if map.len() != 1 {
        return None;
    }
    let millis = map.get("$date")?.as_i64()?;
    Some(Value::DateTime(millis))
}

/// A dotted field path. The empty path refers to the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path(String);

impl Path {
    pub fn root() -> Self {
        Self(String::new())
    }

    pub fn field(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Leading segment of the path; `None` for the root path.
    pub fn head(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.split('.').next()
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered sequence of `(field name, value)` pairs.
///
/// Field order is preserved through iteration and serialization. Lookup by
/// name returns the first match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Resolves a dotted path by walking nested objects. Arrays are opaque:
    /// any path segment landing on a non-object aborts the walk.
    pub fn lookup(&self, path: &Path) -> Option<&Value> {
        let mut segments = path.segments();
        let first = segments.next()?;
        let mut current = self.get(first)?;
        for segment in segments {
            match current {
                Value::Object(doc) => current = doc.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decodes a JSON object into a document; `None` for any other JSON value.
    pub fn from_json(json: &Json) -> Option<Self> {
        match Value::from_json(json) {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Json {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json());
        }
        Json::Object(map)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a (String, Value);
    type IntoIter = std::slice::Iter<'a, (String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

/// Why a value failed the non-negative-integer parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerError {
    NotANumber,
    Negative,
    Fractional,
}

/// Parses a numeric value into a non-negative integer.
///
/// Doubles are accepted only when integral (`5.0` parses as `5`); fractional
/// and negative inputs are rejected with the corresponding error.
pub fn integer_from_value(value: &Value) -> Result<u64, IntegerError> {
    match value {
        Value::Int32(i) => u64::try_from(*i).map_err(|_| IntegerError::Negative),
        Value::Int64(i) => u64::try_from(*i).map_err(|_| IntegerError::Negative),
        Value::Double(d) => {
            if d.fract() != 0.0 || d.is_nan() || d.is_infinite() {
                Err(IntegerError::Fractional)
            } else if *d < 0.0 {
                Err(IntegerError::Negative)
            } else {
                Ok(*d as u64)
            }
        }
        _ => Err(IntegerError::NotANumber),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- TypeTag / TypeSpec --

    #[test]
    fn tag_aliases_round_trip_through_resolver() {
        for tag in [
            TypeTag::Double,
            TypeTag::Str,
            TypeTag::Object,
            TypeTag::Array,
            TypeTag::Bool,
            TypeTag::Null,
            TypeTag::Regex,
            TypeTag::Int,
            TypeTag::Long,
            TypeTag::Date,
        ] {
            assert_eq!(TypeSpec::from_alias(tag.alias()), Some(TypeSpec::Tag(tag)));
        }
        assert_eq!(TypeSpec::from_alias("number"), Some(TypeSpec::AnyNumber));
        assert_eq!(TypeSpec::from_alias("decimal"), None);
    }

    #[test]
    fn any_number_matches_every_numeric_tag() {
        assert!(TypeSpec::AnyNumber.matches(TypeTag::Int));
        assert!(TypeSpec::AnyNumber.matches(TypeTag::Long));
        assert!(TypeSpec::AnyNumber.matches(TypeTag::Double));
        assert!(!TypeSpec::AnyNumber.matches(TypeTag::Str));
    }

    #[test]
    fn concrete_spec_matches_only_its_tag() {
        assert!(TypeSpec::Tag(TypeTag::Str).matches(TypeTag::Str));
        assert!(!TypeSpec::Tag(TypeTag::Str).matches(TypeTag::Object));
    }

    // -- JSON interop --

    #[test]
    fn from_json_picks_narrowest_integer() {
        assert_eq!(Value::from_json(&json!(5)), Value::Int32(5));
        assert_eq!(
            Value::from_json(&json!(5_000_000_000_i64)),
            Value::Int64(5_000_000_000)
        );
        assert_eq!(Value::from_json(&json!(5.5)), Value::Double(5.5));
    }

    #[test]
    fn from_json_decodes_regex_wrapper() {
        let v = Value::from_json(&json!({"$regularExpression": {"pattern": "^a", "options": ""}}));
        assert_eq!(
            v,
            Value::Regex {
                pattern: "^a".into(),
                options: String::new()
            }
        );
    }

    #[test]
    fn from_json_decodes_regex_wrapper_without_options() {
        let v = Value::from_json(&json!({"$regularExpression": {"pattern": "^a"}}));
        assert_eq!(v.tag(), TypeTag::Regex);
    }

    #[test]
    fn from_json_keeps_malformed_regex_wrapper_structural() {
        let v = Value::from_json(&json!({"$regularExpression": {"pattern": 1}}));
        assert_eq!(v.tag(), TypeTag::Object);
        let v = Value::from_json(&json!({"$regularExpression": {"pattern": "a", "extra": 1}}));
        assert_eq!(v.tag(), TypeTag::Object);
    }

    #[test]
    fn from_json_decodes_date_wrapper() {
        assert_eq!(
            Value::from_json(&json!({"$date": 1234})),
            Value::DateTime(1234)
        );
    }

    #[test]
    fn json_round_trips_structurally() {
        let json = json!({
            "a": 1,
            "b": "text",
            "c": [true, null, 2.5],
            "d": {"nested": {"$regularExpression": {"pattern": "x", "options": ""}}},
        });
        let doc = Document::from_json(&json).unwrap();
        assert_eq!(doc.to_json(), json);
    }

    // -- Document lookup --

    fn sample_doc() -> Document {
        Document::from_json(&json!({"a": {"b": {"c": 7}}, "s": "str", "n": null})).unwrap()
    }

    #[test]
    fn lookup_walks_nested_objects() {
        let doc = sample_doc();
        assert_eq!(doc.lookup(&Path::field("a.b.c")), Some(&Value::Int32(7)));
        assert_eq!(doc.lookup(&Path::field("a.b")).map(Value::tag), Some(TypeTag::Object));
        assert_eq!(doc.lookup(&Path::field("a.x")), None);
        assert_eq!(doc.lookup(&Path::field("s.x")), None);
    }

    #[test]
    fn lookup_finds_null_fields() {
        let doc = sample_doc();
        assert_eq!(doc.lookup(&Path::field("n")), Some(&Value::Null));
    }

    #[test]
    fn get_returns_first_match_for_duplicate_names() {
        let mut doc = Document::new();
        doc.push("a", Value::Int32(1));
        doc.push("a", Value::Int32(2));
        assert_eq!(doc.get("a"), Some(&Value::Int32(1)));
    }

    #[test]
    fn path_head_and_root() {
        assert!(Path::root().is_root());
        assert_eq!(Path::root().head(), None);
        assert_eq!(Path::field("a.b").head(), Some("a"));
        assert_eq!(Path::field("a").head(), Some("a"));
    }

    // -- integer_from_value --

    #[test]
    fn integer_parse_accepts_integral_inputs() {
        assert_eq!(integer_from_value(&Value::Int32(5)), Ok(5));
        assert_eq!(integer_from_value(&Value::Int64(5)), Ok(5));
        assert_eq!(integer_from_value(&Value::Double(5.0)), Ok(5));
        assert_eq!(integer_from_value(&Value::Double(0.0)), Ok(0));
    }

    #[test]
    fn integer_parse_rejects_bad_inputs() {
        assert_eq!(
            integer_from_value(&Value::Int32(-1)),
            Err(IntegerError::Negative)
        );
        assert_eq!(
            integer_from_value(&Value::Double(-2.0)),
            Err(IntegerError::Negative)
        );
        assert_eq!(
            integer_from_value(&Value::Double(5.5)),
            Err(IntegerError::Fractional)
        );
        assert_eq!(
            integer_from_value(&Value::Str("5".into())),
            Err(IntegerError::NotANumber)
        );
    }
}
