//! Chunks of company text as they move between splitter and vector store.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A token-bounded slice of a company's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// The chunk text
    pub text: String,

    /// Position of this chunk in the split sequence
    pub chunk_index: usize,

    /// Company the text belongs to
    pub company: String,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, chunk_index: usize, company: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            chunk_index,
            company: company.into(),
        }
    }

    /// Stable identity of the chunk within its collection.
    ///
    /// Re-ingesting identical text overwrites instead of duplicating.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.company.as_bytes());
        hasher.update([0]);
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A chunk paired with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

impl EmbeddedChunk {
    pub fn new(chunk: DocumentChunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// A chunk returned from similarity search.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,

    /// Cosine similarity to the query (higher is closer)
    pub score: f32,
}
