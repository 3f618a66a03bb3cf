//! Retrieval routes: ingest a company's text, then ask about it.

use axum::{extract::Extension, Json};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::routes::intel::{require_company, AnalyzeRequest};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub summary: String,
    pub chunks: usize,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub company: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailDomainsRequest {
    pub company: String,
}

#[derive(Debug, Serialize)]
pub struct EmailDomainsResponse {
    pub company: String,
    pub domains: Vec<String>,
}

/// Summarize, chunk, embed and store a company's text.
///
/// The only route that fails on a backend error, since nothing was stored.
pub async fn ingest_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    let company = require_company(&request.company)?;

    let report = state
        .intel
        .ingest(&request.text, company, &request.keywords)
        .await?;

    info!(company = %company, chunks = report.chunks, "Ingest request complete");
    Ok(Json(IngestResponse {
        summary: report.summary,
        chunks: report.chunks,
    }))
}

/// `{company, keywords}` to `{keyword: answer | null}`.
pub async fn ask_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<IndexMap<String, Option<String>>>, ApiError> {
    let company = require_company(&request.company)?;
    Ok(Json(state.intel.ask_keywords(company, &request.keywords).await))
}

/// Domains the company's stored text says it sends email from.
pub async fn email_domains_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<EmailDomainsRequest>,
) -> Result<Json<EmailDomainsResponse>, ApiError> {
    let company = require_company(&request.company)?;
    let domains = state.intel.email_domains(company).await;

    Ok(Json(EmailDomainsResponse {
        company: company.to_string(),
        domains,
    }))
}
