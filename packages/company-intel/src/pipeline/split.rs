//! Token-aware text splitting.
//!
//! Sizes are counted with the `cl100k_base` BPE used by the completion and
//! embedding models, so a chunk budget maps directly onto model context.

use std::sync::OnceLock;

use text_splitter::{ChunkConfig, TextSplitter};
use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::error::{IntelError, Result};
use crate::types::chunk::DocumentChunk;
use crate::types::config::IntelConfig;

fn tokenizer() -> Result<&'static CoreBPE> {
    static TOKENIZER: OnceLock<std::result::Result<CoreBPE, String>> = OnceLock::new();

    match TOKENIZER.get_or_init(|| {
        cl100k_base().map_err(|e| format!("failed to initialize tokenizer: {e}"))
    }) {
        Ok(tokenizer) => Ok(tokenizer),
        Err(err) => Err(IntelError::Splitter(err.clone())),
    }
}

/// Number of tokens in `text`.
pub fn count_tokens(text: &str) -> Result<usize> {
    Ok(tokenizer()?.encode_ordinary(text).len())
}

/// Splits text into chunks of at most `chunk_tokens` tokens, with
/// `overlap_tokens` shared between neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSplitter {
    chunk_tokens: usize,
    overlap_tokens: usize,
}

impl TokenSplitter {
    pub fn new(chunk_tokens: usize, overlap_tokens: usize) -> Result<Self> {
        if chunk_tokens == 0 {
            return Err(IntelError::Splitter("chunk size must be > 0".into()));
        }
        if overlap_tokens >= chunk_tokens {
            return Err(IntelError::Splitter(format!(
                "overlap of {overlap_tokens} tokens must be smaller than chunk size {chunk_tokens}"
            )));
        }
        Ok(Self {
            chunk_tokens,
            overlap_tokens,
        })
    }

    /// Splitter for the map stage.
    pub fn for_map(config: &IntelConfig) -> Result<Self> {
        Self::new(
            config.map_chunk_tokens,
            config.overlap_tokens(config.map_chunk_tokens),
        )
    }

    /// Splitter for chunks headed to the vector store.
    pub fn for_storage(config: &IntelConfig) -> Result<Self> {
        Self::new(
            config.storage_chunk_tokens,
            config.overlap_tokens(config.storage_chunk_tokens),
        )
    }

    pub fn chunk_tokens(&self) -> usize {
        self.chunk_tokens
    }

    pub fn overlap_tokens(&self) -> usize {
        self.overlap_tokens
    }

    /// Split text into token-bounded chunks. Blank text yields no chunks.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let config = ChunkConfig::new(self.chunk_tokens)
            .with_overlap(self.overlap_tokens)
            .map_err(|e| IntelError::Splitter(format!("invalid chunk overlap: {e}")))?
            .with_sizer(tokenizer()?);
        let splitter = TextSplitter::new(config);

        Ok(splitter.chunks(text).map(str::to_owned).collect())
    }

    /// Split text into chunks tagged with their position and company.
    pub fn split_documents(&self, text: &str, company: &str) -> Result<Vec<DocumentChunk>> {
        Ok(self
            .split(text)?
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| DocumentChunk::new(chunk, i, company))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(TokenSplitter::new(0, 0).is_err());
        assert!(TokenSplitter::new(10, 10).is_err());
        assert!(TokenSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn test_config_splitters() {
        let config = IntelConfig::default();
        let map = TokenSplitter::for_map(&config).unwrap();
        let storage = TokenSplitter::for_storage(&config).unwrap();

        assert_eq!(map.chunk_tokens(), 8000);
        assert_eq!(map.overlap_tokens(), 400);
        assert_eq!(storage.chunk_tokens(), 1024);
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = TokenSplitter::new(100, 0).unwrap();
        let chunks = splitter.split("Acme makes steel in Linz.").unwrap();
        assert_eq!(chunks, vec!["Acme makes steel in Linz.".to_string()]);
    }

    #[test]
    fn test_blank_text_has_no_chunks() {
        let splitter = TokenSplitter::new(100, 0).unwrap();
        assert!(splitter.split("  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_chunks_respect_token_budget() {
        let text = "Acme operates a rolling mill in Linz. ".repeat(200);
        let splitter = TokenSplitter::new(50, 5).unwrap();
        let chunks = splitter.split(&text).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(count_tokens(chunk).unwrap() <= 50);
        }
    }

    #[test]
    fn test_split_documents_tags_chunks() {
        let text = "Plant one is in Linz. ".repeat(100);
        let splitter = TokenSplitter::new(40, 0).unwrap();
        let docs = splitter.split_documents(&text, "Acme").unwrap();

        assert!(docs.len() > 1);
        for (i, doc) in docs.iter().enumerate() {
            assert_eq!(doc.chunk_index, i);
            assert_eq!(doc.company, "Acme");
        }
    }
}
