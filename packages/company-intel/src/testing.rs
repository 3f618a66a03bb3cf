//! Testing utilities including a scripted mock backend.
//!
//! These are useful for testing applications that use the library without
//! making real completion or embedding calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{IntelError, Result};
use crate::traits::ai::AI;

/// A mock AI implementation for testing.
///
/// Completions are resolved in this order:
/// 1. a prompt matching a failure needle fails,
/// 2. the next scripted response, if any remain,
/// 3. the first rule whose needle the prompt contains,
/// 4. the default response (`NONE`).
///
/// Embeddings are derived from a SHA-256 of the text unless overridden.
#[derive(Clone)]
pub struct MockAI {
    /// Responses returned in call order
    script: Arc<RwLock<VecDeque<String>>>,

    /// (needle, response) rules matched against the prompt
    rules: Arc<RwLock<Vec<(String, String)>>>,

    /// Prompts containing any of these fail
    failures: Arc<RwLock<Vec<String>>>,

    /// Predefined embeddings by text
    embeddings: Arc<RwLock<HashMap<String, Vec<f32>>>>,

    /// Response when nothing else matches
    default_response: String,

    /// Default embedding dimension
    embedding_dim: usize,

    /// Artificial latency for every completion
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAICall>>>,
}

/// Record of a call made to the mock AI.
#[derive(Debug, Clone, PartialEq)]
pub enum MockAICall {
    Complete { persona: String, prompt: String },
    Embed { text: String },
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAI {
    /// Create a new mock AI with default behavior.
    pub fn new() -> Self {
        Self {
            script: Arc::default(),
            rules: Arc::default(),
            failures: Arc::default(),
            embeddings: Arc::default(),
            default_response: "NONE".to_string(),
            embedding_dim: 64,
            delay: None,
            calls: Arc::default(),
        }
    }

    /// Answer `response` to any prompt containing `needle`.
    pub fn with_response(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.rules
            .write()
            .unwrap()
            .push((needle.into(), response.into()));
        self
    }

    /// Queue responses returned in call order before any rule is consulted.
    pub fn with_responses(self, responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.script
            .write()
            .unwrap()
            .extend(responses.into_iter().map(Into::into));
        self
    }

    /// Fail every completion whose prompt contains `needle`.
    ///
    /// An empty needle fails every completion.
    pub fn with_failure(self, needle: impl Into<String>) -> Self {
        self.failures.write().unwrap().push(needle.into());
        self
    }

    /// Set the response used when nothing else matches.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Set the embedding dimension.
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    /// Add a predefined embedding for text.
    pub fn with_embedding(self, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.embeddings
            .write()
            .unwrap()
            .insert(text.into(), embedding);
        self
    }

    /// Delay every completion.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of completion calls made.
    pub fn completion_count(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockAICall::Complete { .. }))
            .count()
    }

    /// Number of embedding calls made.
    pub fn embed_count(&self) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, MockAICall::Embed { .. }))
            .count()
    }

    /// Prompts sent to `complete`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                MockAICall::Complete { prompt, .. } => Some(prompt.clone()),
                MockAICall::Embed { .. } => None,
            })
            .collect()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    /// Generate a deterministic embedding based on text.
    fn generate_deterministic_embedding(&self, text: &str) -> Vec<f32> {
        use sha2::{Digest, Sha256};

        let hash = Sha256::digest(text.as_bytes());
        (0..self.embedding_dim)
            .map(|i| (hash[i % 32] as f32 / 127.5) - 1.0)
            .collect()
    }

    fn resolve(&self, prompt: &str) -> Result<String> {
        if let Some(needle) = self
            .failures
            .read()
            .unwrap()
            .iter()
            .find(|needle| prompt.contains(needle.as_str()))
        {
            return Err(IntelError::ai(format!("mock failure for '{}'", needle)));
        }

        if let Some(next) = self.script.write().unwrap().pop_front() {
            return Ok(next);
        }

        Ok(self
            .rules
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone()))
    }
}

#[async_trait]
impl AI for MockAI {
    async fn complete(&self, persona: &str, prompt: &str) -> Result<String> {
        self.calls.write().unwrap().push(MockAICall::Complete {
            persona: persona.to_string(),
            prompt: prompt.to_string(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.resolve(prompt)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.write().unwrap().push(MockAICall::Embed {
            text: text.to_string(),
        });

        Ok(self
            .embeddings
            .read()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.generate_deterministic_embedding(text)))
    }
}
