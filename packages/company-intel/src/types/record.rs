//! Durable per-company records.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::summary::StructuredSummary;

/// Everything known about one company, keyed by company name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Company name (the record identity)
    pub company: String,

    /// Named fields, typically one per summary keyword
    pub fields: IndexMap<String, Value>,

    /// Fingerprint of the prompts that produced the fields.
    ///
    /// Compare against the current prompt registry to detect stale data.
    pub prompt_fingerprint: Option<String>,

    /// When the record was last written
    pub updated_at: DateTime<Utc>,
}

impl CompanyRecord {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            fields: IndexMap::new(),
            prompt_fingerprint: None,
            updated_at: Utc::now(),
        }
    }

    /// Record holding one string field per summary keyword.
    pub fn from_summary(company: impl Into<String>, summary: &StructuredSummary) -> Self {
        let mut record = Self::new(company);
        for (keyword, text) in summary.iter() {
            record
                .fields
                .insert(keyword.clone(), Value::String(text.clone()));
        }
        record
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.prompt_fingerprint = Some(fingerprint.into());
        self
    }

    /// Apply `update` on top of this record.
    ///
    /// Fields in `update` overwrite fields of the same name; all other
    /// fields are kept. The fingerprint is replaced only when `update`
    /// carries one.
    pub fn merge(&mut self, update: CompanyRecord) {
        for (key, value) in update.fields {
            self.fields.insert(key, value);
        }
        if update.prompt_fingerprint.is_some() {
            self.prompt_fingerprint = update.prompt_fingerprint;
        }
        self.updated_at = update.updated_at;
    }

    /// Whether the record was produced by prompts with `fingerprint`.
    pub fn is_current(&self, fingerprint: &str) -> bool {
        self.prompt_fingerprint.as_deref() == Some(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_sets_fields() {
        let mut record = CompanyRecord::new("Acme")
            .with_field("sites", json!("Linz"))
            .with_field("domain", json!("acme.com"))
            .with_fingerprint("v1");

        record.merge(CompanyRecord::new("Acme").with_field("sites", json!("Linz, Graz")));

        assert_eq!(record.fields["sites"], json!("Linz, Graz"));
        assert_eq!(record.fields["domain"], json!("acme.com"));
        assert!(record.is_current("v1"));

        record.merge(CompanyRecord::new("Acme").with_fingerprint("v2"));
        assert!(record.is_current("v2"));
    }

    #[test]
    fn test_from_summary() {
        let keywords = vec!["sites".to_string(), "process".to_string()];
        let summary = StructuredSummary::from_sections("1. Sites:\nLinz", &keywords);
        let record = CompanyRecord::from_summary("Acme", &summary);

        assert_eq!(record.fields["sites"], json!("Linz"));
        assert_eq!(record.fields["process"], json!(""));
    }
}
