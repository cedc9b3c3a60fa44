//! Compiled regex paired with its original source text.

use regex::Regex;

use crate::error::MatchParseError;

/// A regular expression that remembers the text it was compiled from.
///
/// Equality, equivalence, and serialization all use the source text; the
/// compiled form exists only for matching. The dialect does not admit flags.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self, MatchParseError> {
        let source = source.into();
        let regex = Regex::new(&source).map_err(|err| {
            MatchParseError::BadValue(format!("invalid regular expression /{source}/: {err}"))
        })?;
        Ok(Self { source, regex })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Unanchored match: succeeds if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_unanchored() {
        let p = Pattern::new("^a").unwrap();
        assert!(p.is_match("abc"));
        assert!(!p.is_match("bac"));
        let p = Pattern::new("bc").unwrap();
        assert!(p.is_match("abcd"));
    }

    #[test]
    fn equality_uses_source_text() {
        assert_eq!(Pattern::new("a+").unwrap(), Pattern::new("a+").unwrap());
        assert_ne!(Pattern::new("a+").unwrap(), Pattern::new("a*").unwrap());
    }

    #[test]
    fn invalid_source_is_rejected() {
        let err = Pattern::new("(").unwrap_err();
        assert!(matches!(err, MatchParseError::BadValue(_)));
    }
}
