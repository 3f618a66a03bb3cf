//! In-memory storage implementation for testing and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::debug;

use crate::error::{IntelError, Result};
use crate::traits::store::{cosine_similarity, DocumentStore, VectorStore};
use crate::types::chunk::{EmbeddedChunk, ScoredChunk};
use crate::types::record::CompanyRecord;

/// In-memory storage for chunks and company records.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    /// collection -> content hash -> chunk
    chunks: RwLock<HashMap<String, IndexMap<String, EmbeddedChunk>>>,
    records: RwLock<HashMap<String, CompanyRecord>>,
}

fn poisoned() -> IntelError {
    IntelError::storage("memory store lock poisoned")
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks in a collection.
    pub fn chunk_count(&self, collection: &str) -> usize {
        self.chunks
            .read()
            .map(|chunks| chunks.get(collection).map_or(0, IndexMap::len))
            .unwrap_or(0)
    }

    /// Number of stored company records.
    pub fn record_count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, collection: &str, chunks: &[EmbeddedChunk]) -> Result<usize> {
        let mut all = self.chunks.write().map_err(|_| poisoned())?;
        let entries = all.entry(collection.to_string()).or_default();
        for chunk in chunks {
            entries.insert(chunk.chunk.content_hash(), chunk.clone());
        }
        debug!(collection, written = chunks.len(), total = entries.len(), "Upserted chunks");
        Ok(chunks.len())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let all = self.chunks.read().map_err(|_| poisoned())?;
        let Some(entries) = all.get(collection) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = entries
            .values()
            .map(|stored| ScoredChunk {
                chunk: stored.chunk.clone(),
                score: cosine_similarity(embedding, &stored.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn delete_collection(&self, collection: &str) -> Result<usize> {
        let mut all = self.chunks.write().map_err(|_| poisoned())?;
        Ok(all.remove(collection).map_or(0, |entries| entries.len()))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn put(&self, id: &str, record: CompanyRecord) -> Result<CompanyRecord> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let stored = match records.get_mut(id) {
            Some(existing) => {
                existing.merge(record);
                existing.clone()
            }
            None => {
                records.insert(id.to_string(), record.clone());
                record
            }
        };
        Ok(stored)
    }

    async fn get(&self, id: &str) -> Result<Option<CompanyRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(id).cloned())
    }
}
