//! AI trait for LLM operations.
//!
//! Every pipeline in this crate talks to the model through exactly two
//! calls: a single-turn completion under a fixed system persona, and a text
//! embedding. Prompt construction and response parsing live in
//! [`crate::pipeline`], not in implementations of this trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Completion and embedding backend.
///
/// Implementations wrap specific LLM providers and translate provider errors
/// into [`crate::IntelError::AI`].
#[async_trait]
pub trait AI: Send + Sync {
    /// Run one completion with `persona` as the system message and `prompt`
    /// as the user message.
    async fn complete(&self, persona: &str, prompt: &str) -> Result<String>;

    /// Generate an embedding for text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }
}

#[async_trait]
impl<T: AI + ?Sized> AI for Arc<T> {
    async fn complete(&self, persona: &str, prompt: &str) -> Result<String> {
        (**self).complete(persona, prompt).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts).await
    }
}
