//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IntelError, Result};

/// Immutable configuration handed to every orchestrator at construction.
///
/// The token budgets are tuned against the completion model's context
/// window; callers targeting a larger model should raise them together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    /// Maximum tokens per chunk for the map stage.
    ///
    /// Default: 8000.
    pub map_chunk_tokens: usize,

    /// Maximum tokens per chunk when preparing text for the vector store.
    ///
    /// Default: 1024.
    pub storage_chunk_tokens: usize,

    /// Token budget for a single reduce call. Map outputs that together
    /// exceed this are collapsed in groups first.
    ///
    /// Default: 4000.
    pub reduce_token_budget: usize,

    /// Fraction of the chunk size re-used as overlap between consecutive
    /// chunks. Clamped to `[0, 0.5]`.
    ///
    /// Default: 0.05.
    pub chunk_overlap_ratio: f32,

    /// Upper bound on collapse rounds before the reduce is forced.
    ///
    /// Default: 8.
    pub max_collapse_rounds: usize,

    /// Deadline for a single completion or embedding call, in seconds.
    ///
    /// Default: 120.
    pub completion_timeout_secs: u64,

    /// Number of chunks retrieved per RAG query.
    ///
    /// Default: 10.
    pub retrieval_k: usize,

    /// Log a warning when a stored summary splits into more chunks than this.
    ///
    /// Default: 4.
    pub storage_chunk_warning: usize,

    /// Longest canonical email pattern accepted.
    ///
    /// Default: 5.
    pub max_pattern_len: usize,

    /// Drop a company's stored chunks before ingesting new ones.
    ///
    /// When false, chunks from earlier ingests stay searchable next to the
    /// new ones. Default: false.
    pub replace_collection_on_ingest: bool,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            map_chunk_tokens: 8000,
            storage_chunk_tokens: 1024,
            reduce_token_budget: 4000,
            chunk_overlap_ratio: 0.05,
            max_collapse_rounds: 8,
            completion_timeout_secs: 120,
            retrieval_k: 10,
            storage_chunk_warning: 4,
            max_pattern_len: 5,
            replace_collection_on_ingest: false,
        }
    }
}

impl IntelConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the map-stage chunk size.
    pub fn with_map_chunk_tokens(mut self, tokens: usize) -> Self {
        self.map_chunk_tokens = tokens;
        self
    }

    /// Set the storage chunk size.
    pub fn with_storage_chunk_tokens(mut self, tokens: usize) -> Self {
        self.storage_chunk_tokens = tokens;
        self
    }

    /// Set the reduce token budget.
    pub fn with_reduce_token_budget(mut self, tokens: usize) -> Self {
        self.reduce_token_budget = tokens;
        self
    }

    /// Set the overlap ratio.
    pub fn with_chunk_overlap_ratio(mut self, ratio: f32) -> Self {
        self.chunk_overlap_ratio = ratio;
        self
    }

    /// Set the per-call deadline.
    pub fn with_completion_timeout_secs(mut self, secs: u64) -> Self {
        self.completion_timeout_secs = secs;
        self
    }

    /// Set the retrieval depth.
    pub fn with_retrieval_k(mut self, k: usize) -> Self {
        self.retrieval_k = k;
        self
    }

    /// Replace a company's chunks on every ingest.
    pub fn with_replace_collection_on_ingest(mut self, replace: bool) -> Self {
        self.replace_collection_on_ingest = replace;
        self
    }

    /// Per-call deadline as a `Duration`.
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    /// Overlap in tokens for a chunk of `chunk_tokens`.
    ///
    /// Always strictly smaller than the chunk.
    pub fn overlap_tokens(&self, chunk_tokens: usize) -> usize {
        let ratio = if self.chunk_overlap_ratio.is_finite() {
            self.chunk_overlap_ratio.clamp(0.0, 0.5)
        } else {
            0.0
        };
        let overlap = (chunk_tokens as f32 * ratio) as usize;
        overlap.min(chunk_tokens.saturating_sub(1))
    }

    /// Reject settings the pipelines cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.map_chunk_tokens == 0 {
            return Err(IntelError::Config("map_chunk_tokens must be > 0".into()));
        }
        if self.storage_chunk_tokens == 0 {
            return Err(IntelError::Config(
                "storage_chunk_tokens must be > 0".into(),
            ));
        }
        if self.reduce_token_budget == 0 {
            return Err(IntelError::Config("reduce_token_budget must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.chunk_overlap_ratio) {
            return Err(IntelError::Config(format!(
                "chunk_overlap_ratio must be in [0, 1), got {}",
                self.chunk_overlap_ratio
            )));
        }
        if self.completion_timeout_secs == 0 {
            return Err(IntelError::Config(
                "completion_timeout_secs must be > 0".into(),
            ));
        }
        Ok(())
    }
}
