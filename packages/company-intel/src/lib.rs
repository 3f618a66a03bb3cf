//! Company Intelligence from Scraped Text
//!
//! Turns noisy scraped text, email lists, job titles and domain lists into
//! structured company data by chaining LLM completions and normalizing their
//! free-text answers.
//!
//! # Design
//!
//! - Every model call goes through the two-method [`AI`] trait
//! - Prompts are immutable templates with declared variables
//! - Chains are small state machines that stop on a `NONE` answer
//! - All parsing of model output lives in [`pipeline::normalize`]
//! - Orchestrators never fail: they degrade to `None`, an empty result or
//!   an echo of the input
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use company_intel::{IntelConfig, IntelService, MemoryStore};
//! use company_intel::testing::MockAI;
//!
//! let service = IntelService::new(
//!     Arc::new(MockAI::new()),
//!     Arc::new(MemoryStore::new()),
//!     IntelConfig::default(),
//! )?;
//!
//! let pattern = service.find_email_pattern(&emails).await;
//! let titles = service.translate_titles("Acme", &titles).await;
//! let summary = service.summarize(&text, "Acme", &keywords).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Backend and storage abstractions (AI, VectorStore, DocumentStore)
//! - [`types`] - Config, chunks, summaries, patterns, records
//! - [`pipeline`] - Prompt registry, chain executor, normalizer, orchestrators
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`ai`] - Backend implementations (RateLimitedAI, OpenAI)
//! - [`testing`] - Mock backend for tests

pub mod ai;
pub mod error;
pub mod pipeline;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{IntelError, Result, TemplateError};
pub use traits::{
    ai::AI,
    store::{collection_for, cosine_similarity, DocumentStore, IntelStore, VectorStore},
};
pub use types::{
    chunk::{DocumentChunk, EmbeddedChunk, ScoredChunk},
    config::IntelConfig,
    pattern::EmailPattern,
    record::CompanyRecord,
    summary::StructuredSummary,
};

// Re-export pipeline components
pub use pipeline::{
    chain::{Chain, ChainExecutionResult, ChainOutput, ChainStage, ChainState, OutputParser},
    domain::{prepare_candidates, DomainMatch, DomainRecognizer},
    email::EmailPatternFinder,
    prompts::{Persona, PromptRegistry, PromptTemplate},
    rag::{IngestReport, KeywordEnhancer, QueryEngine, Rag, RagIngestor},
    service::IntelService,
    split::{count_tokens, TokenSplitter},
    summarize::{summary_fingerprint, Summarizer},
    translate::{PositionedEntry, Translator},
};

// Re-export backends and stores
pub use ai::RateLimitedAI;
pub use stores::MemoryStore;

#[cfg(feature = "openai")]
pub use ai::OpenAI;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;
