//! Index-preserving batch translation of job titles.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::pipeline::chain::{Chain, ChainStage, ChainState, OutputParser};
use crate::pipeline::normalize::is_translatable;
use crate::pipeline::prompts::{Persona, TRANSLATE_TITLES};
use crate::traits::ai::AI;
use crate::types::config::IntelConfig;

/// A value tagged with its position in the caller's list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedEntry {
    pub index: usize,
    pub value: String,
}

impl PositionedEntry {
    /// Entries worth translating, trimmed, tagged with their original index.
    pub fn collect(titles: &[String]) -> Vec<Self> {
        titles
            .iter()
            .enumerate()
            .filter(|(_, title)| is_translatable(title))
            .map(|(index, title)| Self {
                index,
                value: title.trim().to_string(),
            })
            .collect()
    }

    /// Write `values` back into a copy of `original` at the tagged positions.
    ///
    /// `values` must pair one-to-one with `entries`.
    pub fn restore(original: &[String], entries: &[Self], values: Vec<String>) -> Vec<String> {
        let mut out = original.to_vec();
        for (entry, value) in entries.iter().zip(values) {
            out[entry.index] = value;
        }
        out
    }
}

/// Translates job titles to English, one model call per batch.
pub struct Translator<A: AI + ?Sized> {
    ai: Arc<A>,
    config: Arc<IntelConfig>,
    chain: Chain,
}

impl<A: AI + ?Sized> Translator<A> {
    pub fn new(ai: Arc<A>, config: Arc<IntelConfig>) -> Self {
        Self {
            ai,
            config,
            chain: Chain::new("translate_titles", Persona::Translation).stage(
                ChainStage::new(TRANSLATE_TITLES, "translated").with_parser(OutputParser::CommaList),
            ),
        }
    }

    /// Translate `titles` for `company`.
    ///
    /// The result always has the same length as `titles`. Blank and
    /// non-alphabetic entries are never sent and come back untouched. Any
    /// failure, or an answer with the wrong number of items, returns the
    /// input unchanged.
    #[instrument(skip(self, titles), fields(company = %company, titles = titles.len()))]
    pub async fn translate(&self, company: &str, titles: &[String]) -> Vec<String> {
        let entries = PositionedEntry::collect(titles);
        if entries.is_empty() {
            debug!("Nothing to translate");
            return titles.to_vec();
        }

        let block = entries
            .iter()
            .map(|e| e.value.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let result = self
            .chain
            .run(
                &*self.ai,
                &[("company", company), ("titles", block.as_str())],
                self.config.completion_timeout(),
            )
            .await;

        if result.state != ChainState::Completed {
            warn!(state = ?result.state, "Translation unavailable, returning input");
            return titles.to_vec();
        }

        let translated = result.list("translated").unwrap_or_default().to_vec();
        if translated.len() != entries.len() {
            warn!(
                sent = entries.len(),
                received = translated.len(),
                "Translation count mismatch, returning input"
            );
            return titles.to_vec();
        }

        info!(translated = entries.len(), "Titles translated");
        PositionedEntry::restore(titles, &entries, translated)
    }
}
