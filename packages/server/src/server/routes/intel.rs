//! Routes for the one-shot pipelines: summary, email pattern, title
//! translation and domain recognition.

use axum::{extract::Extension, Json};
use company_intel::{DomainMatch, EmailPattern, StructuredSummary};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::server::app::AppState;
use crate::server::error::ApiError;

/// One row of a title batch. Only `title` is read or written.
pub type TitleRow = Map<String, Value>;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub text: String,
    pub company: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

pub(crate) fn require_company(company: &str) -> Result<&str, ApiError> {
    let company = company.trim();
    if company.is_empty() {
        return Err(ApiError::Validation("company must not be empty".to_string()));
    }
    Ok(company)
}

/// Summarize scraped text into one section per keyword.
///
/// Every keyword is present in the response; sections are empty strings
/// when the model had nothing or the backend failed.
pub async fn analyze_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<IndexMap<String, String>>, ApiError> {
    let company = require_company(&request.company)?;

    let summary = state
        .intel
        .summarize(&request.text, company, &request.keywords)
        .await
        .unwrap_or_else(|| StructuredSummary::empty(&request.keywords));

    Ok(Json(summary.into_inner()))
}

/// `{domain: [emails]}` to `{domain: pattern | null}`.
pub async fn find_email_pattern_handler(
    Extension(state): Extension<AppState>,
    Json(batches): Json<IndexMap<String, Vec<String>>>,
) -> Json<IndexMap<String, Option<EmailPattern>>> {
    Json(state.intel.find_email_patterns(&batches).await)
}

/// `{company: [{title, ...}]}` with every translated title written back into
/// its own row. Rows without a string `title` pass through untouched.
pub async fn convert_titles_handler(
    Extension(state): Extension<AppState>,
    Json(mut companies): Json<IndexMap<String, Vec<TitleRow>>>,
) -> Json<IndexMap<String, Vec<TitleRow>>> {
    let titles: IndexMap<String, Vec<String>> = companies
        .iter()
        .map(|(company, rows)| (company.clone(), rows.iter().map(title_of).collect()))
        .collect();

    let translated = state.intel.translate_companies(&titles).await;

    for (company, rows) in companies.iter_mut() {
        let Some(new_titles) = translated.get(company) else {
            continue;
        };
        for (row, title) in rows.iter_mut().zip(new_titles) {
            if row.get("title").is_some_and(Value::is_string) {
                row.insert("title".to_string(), Value::String(title.clone()));
            }
        }
    }

    Json(companies)
}

fn title_of(row: &TitleRow) -> String {
    row.get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `{company: [candidates]}` to `{company: domain | "NONE" | null}`.
pub async fn filter_domains_handler(
    Extension(state): Extension<AppState>,
    Json(batches): Json<IndexMap<String, Vec<String>>>,
) -> Json<IndexMap<String, DomainMatch>> {
    Json(state.intel.recognize_domains(&batches).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_of_missing_or_non_string() {
        let row: TitleRow = serde_json::from_value(json!({"title": 3, "name": "Ada"})).unwrap();
        assert_eq!(title_of(&row), "");

        let row: TitleRow = serde_json::from_value(json!({"name": "Ada"})).unwrap();
        assert_eq!(title_of(&row), "");

        let row: TitleRow = serde_json::from_value(json!({"title": "Einkäufer"})).unwrap();
        assert_eq!(title_of(&row), "Einkäufer");
    }

    #[test]
    fn test_require_company() {
        assert_eq!(require_company("  Acme ").unwrap(), "Acme");
        assert!(matches!(require_company(" "), Err(ApiError::Validation(_))));
    }
}
