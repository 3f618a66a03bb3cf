//! Keyword-addressed summaries.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::pipeline::normalize::parse_numbered_sections;

/// Extracted text per caller keyword, in keyword order.
///
/// A keyword with nothing extracted maps to an empty string, never to a
/// missing entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredSummary(IndexMap<String, String>);

impl StructuredSummary {
    /// Every keyword mapped to an empty string.
    pub fn empty(keywords: &[String]) -> Self {
        Self(
            keywords
                .iter()
                .map(|k| (k.clone(), String::new()))
                .collect(),
        )
    }

    /// Parse a reduced answer with numbered headings, one per keyword.
    pub fn from_sections(text: &str, keywords: &[String]) -> Self {
        Self(parse_numbered_sections(text, keywords))
    }

    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.0.get(keyword).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when at least one keyword has extracted text.
    pub fn has_content(&self) -> bool {
        self.0.values().any(|v| !v.is_empty())
    }

    pub fn into_inner(self) -> IndexMap<String, String> {
        self.0
    }
}

impl From<IndexMap<String, String>> for StructuredSummary {
    fn from(map: IndexMap<String, String>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_keeps_every_keyword() {
        let keywords = vec!["sites".to_string(), "process".to_string()];
        let summary = StructuredSummary::empty(&keywords);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary.get("process"), Some(""));
        assert!(!summary.has_content());
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let keywords = vec!["sites".to_string()];
        let summary = StructuredSummary::from_sections("1. Sites:\nLinz", &keywords);

        assert!(summary.has_content());
        assert_eq!(
            serde_json::to_string(&summary).unwrap(),
            r#"{"sites":"Linz"}"#
        );
    }
}
