//! Process-wide wiring of every orchestrator.

use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use tracing::info;

use crate::error::Result;
use crate::pipeline::domain::{DomainMatch, DomainRecognizer};
use crate::pipeline::email::EmailPatternFinder;
use crate::pipeline::rag::{IngestReport, Rag};
use crate::pipeline::summarize::Summarizer;
use crate::pipeline::translate::Translator;
use crate::traits::ai::AI;
use crate::traits::store::IntelStore;
use crate::types::config::IntelConfig;
use crate::types::pattern::EmailPattern;
use crate::types::summary::StructuredSummary;

/// Every orchestrator built once over a shared backend, store and config.
///
/// Cheap to share behind an `Arc`; nothing in it is mutated after
/// construction.
pub struct IntelService {
    config: Arc<IntelConfig>,
    summarizer: Summarizer<dyn AI>,
    emails: EmailPatternFinder<dyn AI>,
    translator: Translator<dyn AI>,
    domains: DomainRecognizer<dyn AI>,
    rag: Rag<dyn AI, dyn IntelStore>,
}

impl IntelService {
    /// Build the service. Fails only on an invalid config.
    pub fn new(ai: Arc<dyn AI>, store: Arc<dyn IntelStore>, config: IntelConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        info!(
            map_chunk_tokens = config.map_chunk_tokens,
            reduce_token_budget = config.reduce_token_budget,
            timeout_secs = config.completion_timeout_secs,
            "Company intel service ready"
        );

        Ok(Self {
            summarizer: Summarizer::new(ai.clone(), config.clone()),
            emails: EmailPatternFinder::new(ai.clone(), config.clone()),
            translator: Translator::new(ai.clone(), config.clone()),
            domains: DomainRecognizer::new(ai.clone(), config.clone()),
            rag: Rag::new(ai, store, config.clone()),
            config,
        })
    }

    pub fn config(&self) -> &IntelConfig {
        &self.config
    }

    pub async fn summarize(
        &self,
        text: &str,
        company: &str,
        keywords: &[String],
    ) -> Option<StructuredSummary> {
        self.summarizer.summarize(text, company, keywords).await
    }

    pub async fn find_email_pattern(&self, emails: &[String]) -> Option<EmailPattern> {
        self.emails.find_pattern(emails).await
    }

    pub async fn translate_titles(&self, company: &str, titles: &[String]) -> Vec<String> {
        self.translator.translate(company, titles).await
    }

    pub async fn recognize_domain(&self, company: &str, candidates: &[String]) -> DomainMatch {
        self.domains.recognize(company, candidates).await
    }

    pub async fn ingest(
        &self,
        text: &str,
        company: &str,
        keywords: &[String],
    ) -> Result<IngestReport> {
        self.rag.ingest(text, company, keywords).await
    }

    pub async fn ask_keywords(
        &self,
        company: &str,
        keywords: &[String],
    ) -> IndexMap<String, Option<String>> {
        self.rag.ask_keywords(company, keywords).await
    }

    pub async fn email_domains(&self, company: &str) -> Vec<String> {
        self.rag.email_domains(company).await
    }

    /// One pattern per key (usually a domain), keys processed concurrently.
    pub async fn find_email_patterns(
        &self,
        batches: &IndexMap<String, Vec<String>>,
    ) -> IndexMap<String, Option<EmailPattern>> {
        let results = join_all(batches.values().map(|emails| self.find_email_pattern(emails))).await;
        batches.keys().cloned().zip(results).collect()
    }

    /// Translate each company's titles, companies processed concurrently.
    pub async fn translate_companies(
        &self,
        batches: &IndexMap<String, Vec<String>>,
    ) -> IndexMap<String, Vec<String>> {
        let results = join_all(
            batches
                .iter()
                .map(|(company, titles)| self.translate_titles(company, titles)),
        )
        .await;
        batches.keys().cloned().zip(results).collect()
    }

    /// One domain answer per company, companies processed concurrently.
    pub async fn recognize_domains(
        &self,
        batches: &IndexMap<String, Vec<String>>,
    ) -> IndexMap<String, DomainMatch> {
        let results = join_all(
            batches
                .iter()
                .map(|(company, candidates)| self.recognize_domain(company, candidates)),
        )
        .await;
        batches.keys().cloned().zip(results).collect()
    }
}
