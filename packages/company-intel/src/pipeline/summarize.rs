//! Map-reduce summarization of scraped company text.
//!
//! 1. Clean the text and split it into `map_chunk_tokens` chunks.
//! 2. Map: extract the numbered sections from each chunk.
//! 3. Collapse: while the partial extractions exceed `reduce_token_budget`,
//!    merge them in budget-sized groups.
//! 4. Reduce: merge what is left into one answer and parse the sections
//!    back onto the caller's keywords.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IntelError, Result};
use crate::pipeline::chain::{Chain, ChainStage, ChainState};
use crate::pipeline::normalize::{clean_scraped_text, extraction_list, is_sentinel};
use crate::pipeline::prompts::{Persona, SUMMARIZE_MAP, SUMMARIZE_REDUCE};
use crate::pipeline::split::{count_tokens, TokenSplitter};
use crate::traits::ai::AI;
use crate::types::config::IntelConfig;
use crate::types::summary::StructuredSummary;

const PARTIAL_SEPARATOR: &str = "\n\n";

/// Keyword-driven map-reduce summarizer.
pub struct Summarizer<A: AI + ?Sized> {
    ai: Arc<A>,
    config: Arc<IntelConfig>,
    map_chain: Chain,
    reduce_chain: Chain,
}

impl<A: AI + ?Sized> Summarizer<A> {
    pub fn new(ai: Arc<A>, config: Arc<IntelConfig>) -> Self {
        Self {
            ai,
            config,
            map_chain: Chain::new("summarize_map", Persona::Summarization)
                .stage(ChainStage::new(SUMMARIZE_MAP, "summary").without_sentinel()),
            reduce_chain: Chain::new("summarize_reduce", Persona::Summarization)
                .stage(ChainStage::new(SUMMARIZE_REDUCE, "summary").without_sentinel()),
        }
    }

    /// Summarize `text` into one entry per keyword.
    ///
    /// Returns `None` when a backend call fails; sections the text says
    /// nothing about come back as empty strings.
    #[instrument(skip(self, text, keywords), fields(company = %company, keywords = keywords.len(), text_len = text.len()))]
    pub async fn summarize(
        &self,
        text: &str,
        company: &str,
        keywords: &[String],
    ) -> Option<StructuredSummary> {
        if keywords.is_empty() {
            return Some(StructuredSummary::default());
        }

        match self.summarize_text(text, company, keywords).await {
            Ok(reduced) => Some(StructuredSummary::from_sections(&reduced, keywords)),
            Err(e) => {
                error!(error = %e, "Summarization failed");
                None
            }
        }
    }

    /// Run map-reduce and return the final reduced answer verbatim.
    ///
    /// Empty when there is no text or no chunk yielded anything.
    pub async fn summarize_text(
        &self,
        text: &str,
        company: &str,
        keywords: &[String],
    ) -> Result<String> {
        let cleaned = clean_scraped_text(text);
        let chunks = TokenSplitter::for_map(&self.config)?.split(&cleaned)?;
        if chunks.is_empty() {
            info!("No text to summarize");
            return Ok(String::new());
        }

        let sections = extraction_list(company, keywords);
        info!(chunks = chunks.len(), "Summarizing content");

        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let mapped = self.combine(&self.map_chain, company, chunk, &sections).await?;
            if mapped.is_empty() || is_sentinel(&mapped) {
                debug!(chunk = i, "Chunk had nothing to extract");
                continue;
            }
            partials.push(mapped);
        }

        if partials.is_empty() {
            warn!("No chunk produced any extraction");
            return Ok(String::new());
        }

        let partials = self.collapse(partials, company, &sections).await?;
        self.combine(
            &self.reduce_chain,
            company,
            &partials.join(PARTIAL_SEPARATOR),
            &sections,
        )
        .await
    }

    /// Merge partials in groups until they fit the reduce budget.
    async fn collapse(
        &self,
        mut partials: Vec<String>,
        company: &str,
        sections: &str,
    ) -> Result<Vec<String>> {
        let budget = self.config.reduce_token_budget;
        let mut rounds = 0;

        loop {
            let tokens = count_tokens(&partials.join(PARTIAL_SEPARATOR))?;
            if tokens <= budget {
                break;
            }
            if rounds >= self.config.max_collapse_rounds {
                warn!(tokens, budget, rounds, "Partials still over budget, reducing anyway");
                break;
            }

            let groups = group_by_budget(&partials, budget, count_tokens)?;
            debug!(round = rounds, tokens, groups = groups.len(), "Collapsing partials");

            let mut collapsed = Vec::with_capacity(groups.len());
            for group in groups {
                collapsed.push(
                    self.combine(
                        &self.reduce_chain,
                        company,
                        &group.join(PARTIAL_SEPARATOR),
                        sections,
                    )
                    .await?,
                );
            }
            partials = collapsed;
            rounds += 1;
        }

        Ok(partials)
    }

    async fn combine(
        &self,
        chain: &Chain,
        company: &str,
        docs: &str,
        sections: &str,
    ) -> Result<String> {
        let result = chain
            .run(
                &*self.ai,
                &[("company", company), ("docs", docs), ("sections", sections)],
                self.config.completion_timeout(),
            )
            .await;

        if let ChainState::Failed { reason, .. } = &result.state {
            return Err(IntelError::ai(reason.clone()));
        }
        Ok(result.text("summary").unwrap_or_default().to_string())
    }
}

/// Fingerprint of the map and reduce prompts.
///
/// Stored with persisted summaries; a mismatch means the summary was
/// produced by an older prompt revision.
pub fn summary_fingerprint() -> String {
    let mut hasher = Sha256::new();
    hasher.update(SUMMARIZE_MAP.fingerprint().as_bytes());
    hasher.update(SUMMARIZE_REDUCE.fingerprint().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Greedily pack documents into groups whose summed length fits `budget`.
///
/// A document larger than the budget on its own forms a single-item group.
fn group_by_budget<F>(docs: &[String], budget: usize, len: F) -> Result<Vec<Vec<String>>>
where
    F: Fn(&str) -> Result<usize>,
{
    let mut groups = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0;

    for doc in docs {
        let n = len(doc)?;
        if !current.is_empty() && current_len + n > budget {
            groups.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(doc.clone());
        current_len += n;
    }
    if !current.is_empty() {
        groups.push(current);
    }

    Ok(groups)
}
