//! Storage traits.
//!
//! Two capabilities, usually backed by one database:
//! - [`VectorStore`] holds embedded summary chunks per company collection
//! - [`DocumentStore`] holds one [`CompanyRecord`] per company
//!
//! Writes are last-writer-wins. There is no optimistic concurrency check,
//! so two concurrent ingests for the same company interleave freely.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::chunk::{EmbeddedChunk, ScoredChunk};
use crate::types::record::CompanyRecord;

/// Embedded chunk storage with similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace chunks in a collection.
    ///
    /// Chunks are keyed by [`crate::DocumentChunk::content_hash`], so
    /// re-ingesting identical text does not duplicate it. Returns the number
    /// of chunks written.
    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<usize>;

    /// The `k` chunks most similar to `embedding`, best first.
    async fn search(&self, collection: &str, embedding: &[f32], k: usize)
        -> Result<Vec<ScoredChunk>>;

    /// Remove a whole collection. Returns the number of chunks removed.
    async fn delete_collection(&self, collection: &str) -> Result<usize>;
}

/// Keyed company records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Merge `record` into the stored record for `id`, creating it if absent.
    ///
    /// Returns the record as stored after the merge.
    async fn put(&self, id: &str, record: CompanyRecord) -> Result<CompanyRecord>;

    /// Get the record for `id`.
    async fn get(&self, id: &str) -> Result<Option<CompanyRecord>>;
}

/// Combined store trait.
pub trait IntelStore: VectorStore + DocumentStore {}

impl<T: VectorStore + DocumentStore> IntelStore for T {}

/// Collection name for a company.
///
/// Lower-cased and trimmed so "Acme " and "acme" share one collection.
pub fn collection_for(company: &str) -> String {
    company.trim().to_lowercase()
}

/// Cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
