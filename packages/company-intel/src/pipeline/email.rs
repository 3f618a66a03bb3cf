//! Email pattern identification.
//!
//! Three chained completions:
//! 1. keep the addresses that carry a person's name
//! 2. analyse each one and name the most frequent structure
//! 3. restate that as exactly one structure phrase
//!
//! The phrase is then canonicalized to a token like `f.l`.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::pipeline::chain::{Chain, ChainStage, ChainState, OutputParser};
use crate::pipeline::prompts::{Persona, EMAIL_FILTER, EMAIL_SELECT, EMAIL_STRUCTURE};
use crate::traits::ai::AI;
use crate::types::config::IntelConfig;
use crate::types::pattern::EmailPattern;

/// Finds the local-part pattern a company uses for employee addresses.
pub struct EmailPatternFinder<A: AI + ?Sized> {
    ai: Arc<A>,
    config: Arc<IntelConfig>,
    chain: Chain,
}

impl<A: AI + ?Sized> EmailPatternFinder<A> {
    pub fn new(ai: Arc<A>, config: Arc<IntelConfig>) -> Self {
        Self {
            ai,
            config,
            chain: email_chain(),
        }
    }

    /// Identify the pattern behind `emails`.
    ///
    /// Blank entries are ignored. Returns `None` without calling the backend
    /// when nothing is left, and `None` when any stage finds no pattern,
    /// fails, or answers with something that does not canonicalize.
    #[instrument(skip(self, emails), fields(emails = emails.len()))]
    pub async fn find_pattern(&self, emails: &[String]) -> Option<EmailPattern> {
        let addresses: Vec<&str> = emails
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect();

        if addresses.is_empty() {
            debug!("No addresses, skipping");
            return None;
        }

        let joined = addresses.join("\n");
        let result = self
            .chain
            .run(
                &*self.ai,
                &[("emails", joined.as_str())],
                self.config.completion_timeout(),
            )
            .await;

        match &result.state {
            ChainState::Completed => {}
            ChainState::ShortCircuited { stage } => {
                info!(stage, "No email pattern found");
                return None;
            }
            _ => return None,
        }

        let phrase = result.list("pattern")?.first()?;
        let pattern = EmailPattern::parse_with_limit(phrase, self.config.max_pattern_len);

        match &pattern {
            Some(p) => info!(pattern = %p, "Email pattern identified"),
            None => warn!(phrase = %phrase, "Pattern phrase did not canonicalize"),
        }
        pattern
    }
}

fn email_chain() -> Chain {
    Chain::new("email_pattern", Persona::EmailPatterns)
        .stage(ChainStage::new(EMAIL_FILTER, "personal_emails"))
        .stage(ChainStage::new(EMAIL_STRUCTURE, "structure"))
        .stage(ChainStage::new(EMAIL_SELECT, "pattern").with_parser(OutputParser::CommaList))
}
