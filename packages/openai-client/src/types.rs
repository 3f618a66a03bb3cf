//! Wire types for the chat completion and embedding endpoints.

use serde::{Deserialize, Serialize};

/// Who a chat message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Body of `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,

    /// Omitted from the body when unset, so the API default applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// The first choice of a completion, plus token accounting when reported.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Token accounting for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<ChatChoice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    /// Null when the model refuses
    #[serde(default)]
    pub content: Option<String>,
}

/// Body of `POST /embeddings`.
#[derive(Debug, Serialize)]
pub(crate) struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: EmbeddingInput<'a>,
}

/// A single string or an array of strings on the wire.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [&'a str]),
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

/// `index` points back into the request's input array.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingData {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_turn_request_body() {
        let request = ChatRequest::new("gpt-3.5-turbo-1106")
            .message(Message::system("You are a linguist."))
            .message(Message::user("Translate this."))
            .temperature(0.0);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "gpt-3.5-turbo-1106",
                "messages": [
                    {"role": "system", "content": "You are a linguist."},
                    {"role": "user", "content": "Translate this."}
                ],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn test_unset_temperature_is_omitted() {
        let body = serde_json::to_value(ChatRequest::new("m")).unwrap();
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_embedding_input_shapes() {
        let single = EmbeddingRequest {
            model: "m",
            input: EmbeddingInput::Single("hello"),
        };
        assert_eq!(
            serde_json::to_value(&single).unwrap(),
            json!({"model": "m", "input": "hello"})
        );

        let texts = ["a", "b"];
        let batch = EmbeddingRequest {
            model: "m",
            input: EmbeddingInput::Batch(&texts),
        };
        assert_eq!(
            serde_json::to_value(&batch).unwrap(),
            json!({"model": "m", "input": ["a", "b"]})
        );
    }

    #[test]
    fn test_null_content_and_missing_usage_fields() {
        let raw: ChatResponseRaw = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}],
                "usage":{"prompt_tokens":12,"total_tokens":12}}"#,
        )
        .unwrap();
        assert!(raw.choices[0].message.content.is_none());
        assert_eq!(raw.usage.unwrap().completion_tokens, 0);
    }
}
