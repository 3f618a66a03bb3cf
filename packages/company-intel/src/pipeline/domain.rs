//! Pick a company's own domain out of a candidate list.

use std::sync::Arc;

use serde::{Serialize, Serializer};
use tracing::{debug, info, instrument, warn};

use crate::pipeline::chain::{Chain, ChainStage, ChainState, OutputParser};
use crate::pipeline::normalize::SENTINEL;
use crate::pipeline::prompts::{Persona, RECOGNIZE_DOMAIN};
use crate::traits::ai::AI;
use crate::types::config::IntelConfig;

/// Outcome of domain recognition for one company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainMatch {
    /// One of the candidates, as the caller spelled it
    Domain(String),

    /// The model found no candidate belonging to the company
    NoMatch,

    /// No usable candidates were given
    Empty,

    /// The backend failed or timed out
    Unavailable,
}

impl DomainMatch {
    pub fn domain(&self) -> Option<&str> {
        match self {
            DomainMatch::Domain(domain) => Some(domain),
            _ => None,
        }
    }
}

/// `Domain` as the string, `NoMatch` as `"NONE"`, the rest as `null`.
impl Serialize for DomainMatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DomainMatch::Domain(domain) => serializer.serialize_str(domain),
            DomainMatch::NoMatch => serializer.serialize_str(SENTINEL),
            DomainMatch::Empty | DomainMatch::Unavailable => serializer.serialize_none(),
        }
    }
}

/// Trimmed, non-empty candidates in input order.
pub fn prepare_candidates(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

fn bare_domain(answer: &str) -> &str {
    answer.trim().trim_start_matches('@').trim_end_matches('.')
}

/// Recognizes which candidate domain belongs to a company.
pub struct DomainRecognizer<A: AI + ?Sized> {
    ai: Arc<A>,
    config: Arc<IntelConfig>,
    chain: Chain,
}

impl<A: AI + ?Sized> DomainRecognizer<A> {
    pub fn new(ai: Arc<A>, config: Arc<IntelConfig>) -> Self {
        Self {
            ai,
            config,
            chain: Chain::new("recognize_domain", Persona::DomainRecognition).stage(
                ChainStage::new(RECOGNIZE_DOMAIN, "domain").with_parser(OutputParser::CommaList),
            ),
        }
    }

    /// Pick the domain of `company` from `candidates`.
    ///
    /// An answer that is not one of the candidates is treated as no match.
    #[instrument(skip(self, candidates), fields(company = %company, candidates = candidates.len()))]
    pub async fn recognize(&self, company: &str, candidates: &[String]) -> DomainMatch {
        let candidates = prepare_candidates(candidates);
        if candidates.is_empty() {
            debug!("No candidates, skipping");
            return DomainMatch::Empty;
        }

        let joined = candidates.join("\n");
        let result = self
            .chain
            .run(
                &*self.ai,
                &[("company", company), ("domains", joined.as_str())],
                self.config.completion_timeout(),
            )
            .await;

        match &result.state {
            ChainState::Completed => {}
            ChainState::ShortCircuited { .. } => return DomainMatch::NoMatch,
            _ => return DomainMatch::Unavailable,
        }

        let Some(answer) = result.list("domain").and_then(|items| items.first()) else {
            warn!("Empty domain answer");
            return DomainMatch::NoMatch;
        };
        let answer = bare_domain(answer);

        match candidates.iter().find(|c| c.eq_ignore_ascii_case(answer)) {
            Some(domain) => {
                info!(domain = %domain, "Domain recognized");
                DomainMatch::Domain(domain.clone())
            }
            None => {
                warn!(answer = %answer, "Answer is not one of the candidates");
                DomainMatch::NoMatch
            }
        }
    }
}
