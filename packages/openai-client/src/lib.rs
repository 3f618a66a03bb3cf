//! Pure OpenAI REST API client
//!
//! A small client for the two endpoints the pipelines need: single-turn chat
//! completions (a system persona plus one user prompt) and embeddings. No
//! domain logic lives here.
//!
//! # Example
//!
//! ```rust,ignore
//! use openai_client::OpenAIClient;
//!
//! let client = OpenAIClient::from_env()?.with_timeout(Duration::from_secs(60))?;
//!
//! let answer = client
//!     .complete("gpt-3.5-turbo-1106", "You are a linguist.", "Translate: Einkäufer")
//!     .await?;
//!
//! let vectors = client
//!     .create_embeddings_batch(&["first chunk", "second chunk"], "text-embedding-ada-002")
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OpenAIError, Result};
pub use types::*;

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use types::{ChatResponseRaw, EmbeddingInput, EmbeddingRequest, EmbeddingResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pure OpenAI API client.
#[derive(Clone)]
pub struct OpenAIClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from environment variable `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| OpenAIError::Config("OPENAI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Point at a proxy or compatible server. A trailing slash is ignored.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every HTTP request made by this client.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAIError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Single-turn completion: one system message, one user message, temperature 0.
    pub async fn complete(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest::new(model)
            .message(Message::system(system))
            .message(Message::user(user))
            .temperature(0.0);

        Ok(self.chat_completion(request).await?.content)
    }

    /// Send a chat request and return the first choice.
    pub async fn chat_completion(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = Instant::now();
        let raw: ChatResponseRaw = self.post("chat/completions", &request).await?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OpenAIError::Api("No response from OpenAI".into()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            response_len = content.len(),
            total_tokens = ?raw.usage.as_ref().map(|u| u.total_tokens),
            "OpenAI chat completion"
        );

        Ok(ChatResponse {
            content,
            usage: raw.usage,
        })
    }

    /// Embed one text.
    pub async fn create_embedding(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model,
            input: EmbeddingInput::Single(text),
        };

        self.embeddings(&request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| OpenAIError::Api("No embedding from OpenAI".into()))
    }

    /// Embed many texts in one request. Output order matches input order.
    pub async fn create_embeddings_batch(
        &self,
        texts: &[&str],
        model: &str,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model,
            input: EmbeddingInput::Batch(texts),
        };

        let embeddings = self.embeddings(&request).await?;
        if embeddings.len() != texts.len() {
            return Err(OpenAIError::Parse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }
        Ok(embeddings)
    }

    async fn embeddings(&self, request: &EmbeddingRequest<'_>) -> Result<Vec<Vec<f32>>> {
        let mut response: EmbeddingResponse = self.post("embeddings", request).await?;

        // The API may return items out of order
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(format!("{}/{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(path, error = %e, "OpenAI request failed");
                OpenAIError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(path, status = %status, error = %error_text, "OpenAI API error");
            return Err(OpenAIError::from_status(status, error_text));
        }

        response
            .json()
            .await
            .map_err(|e| OpenAIError::Parse(e.to_string()))
    }
}
