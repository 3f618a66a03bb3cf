//! OpenAI implementation of the AI trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use company_intel::ai::OpenAI;
//!
//! let ai = OpenAI::from_env()?.with_model("gpt-4o-mini");
//! ```

use async_trait::async_trait;
use openai_client::{OpenAIClient, OpenAIError};

use crate::error::{IntelError, Result};
use crate::traits::ai::AI;

/// Completion model used by default.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-1106";

/// Embedding model used by default.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// OpenAI-backed completions and embeddings.
///
/// Completions run at temperature 0 with the persona as the system message.
#[derive(Clone)]
pub struct OpenAI {
    client: OpenAIClient,
    model: String,
    embedding_model: String,
}

impl OpenAI {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_client(OpenAIClient::new(api_key))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: OpenAIClient) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let client = OpenAIClient::from_env().map_err(|e| IntelError::Config(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

fn ai_error(e: OpenAIError) -> IntelError {
    tracing::debug!(transient = e.is_transient(), error = %e, "OpenAI call failed");
    IntelError::AI(Box::new(e))
}

#[async_trait]
impl AI for OpenAI {
    async fn complete(&self, persona: &str, prompt: &str) -> Result<String> {
        self.client
            .complete(&self.model, persona, prompt)
            .await
            .map_err(ai_error)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .create_embedding(text, &self.embedding_model)
            .await
            .map_err(ai_error)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.client
            .create_embeddings_batch(texts, &self.embedding_model)
            .await
            .map_err(ai_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let ai = OpenAI::new("sk-test");
        assert_eq!(ai.model(), DEFAULT_MODEL);
        assert_eq!(ai.embedding_model(), DEFAULT_EMBEDDING_MODEL);

        let ai = ai.with_model("gpt-4o-mini").with_embedding_model("text-embedding-3-small");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.embedding_model(), "text-embedding-3-small");
    }
}
