//! Canonical email local-part patterns.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::pipeline::normalize::{canonicalize_pattern, DEFAULT_MAX_PATTERN_LEN};

/// A canonical email pattern token such as `f.l`, `f1l` or `f_l1`.
///
/// Only constructible through normalization (deserialization included), so
/// every value is over the alphabet `{f, l, f1, l1, ".", "-", "_"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct EmailPattern(String);

impl EmailPattern {
    /// Canonicalize a free-text pattern description.
    ///
    /// Returns `None` when the phrase does not reduce to a short token.
    pub fn parse(phrase: &str) -> Option<Self> {
        Self::parse_with_limit(phrase, DEFAULT_MAX_PATTERN_LEN)
    }

    /// Like [`EmailPattern::parse`] with an explicit length bound.
    pub fn parse_with_limit(phrase: &str, max_len: usize) -> Option<Self> {
        canonicalize_pattern(phrase, max_len).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailPattern {
    type Error = String;

    /// Stored values are already canonical, so only the alphabet is checked
    /// here; the length bound applies when parsing model output.
    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let limit = raw.chars().count().max(DEFAULT_MAX_PATTERN_LEN);
        canonicalize_pattern(&raw, limit)
            .map(Self)
            .ok_or_else(|| format!("not an email pattern: {raw:?}"))
    }
}

impl Serialize for EmailPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl fmt::Display for EmailPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailPattern {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let pattern = EmailPattern::parse("First Name.Last Name@company.com").unwrap();
        assert_eq!(pattern.to_string(), "f.l");
        assert_eq!(serde_json::to_string(&pattern).unwrap(), "\"f.l\"");
    }

    #[test]
    fn test_deserialize_goes_through_normalization() {
        let pattern: EmailPattern = serde_json::from_str("\"f_l1\"").unwrap();
        assert_eq!(pattern.as_str(), "f_l1");

        let pattern: EmailPattern = serde_json::from_str("\"first.last\"").unwrap();
        assert_eq!(pattern.as_str(), "f.l");

        assert!(serde_json::from_str::<EmailPattern>("\"ada.lovelace\"").is_err());
        assert!(serde_json::from_str::<EmailPattern>("\"\"").is_err());
    }

    #[test]
    fn test_serialize_round_trips_through_deserialize() {
        let pattern = EmailPattern::parse("[last name]_[first name initial]").unwrap();
        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(serde_json::from_str::<EmailPattern>(&json).unwrap(), pattern);
    }
}
