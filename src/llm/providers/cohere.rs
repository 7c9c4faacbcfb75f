//! Cohere adapter: the chat and embed endpoints of the v1 API.

use crate::llm::{DocumentType, LlmClient, LlmError, Message, ProviderDefaults, clip_input};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.cohere.ai";

/// Chat roles understood by the Cohere wire format.
pub mod roles {
    /// System instructions.
    pub const SYSTEM: &str = "SYSTEM";
    /// End-user content.
    pub const USER: &str = "USER";
    /// Model responses.
    pub const CHATBOT: &str = "CHATBOT";
}

/// Response shape of a `/v1/chat` call; fields default so malformed payloads
/// surface as [`LlmError::EmptyResponse`] instead of a decode error.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: EmbedVectors,
}

#[derive(Debug, Default, Deserialize)]
struct EmbedVectors {
    #[serde(default)]
    float: Vec<Vec<f32>>,
}

/// HTTP client for the Cohere API.
pub struct CohereClient {
    client: Client,
    api_key: String,
    base_url: String,
    generation_model: Option<String>,
    embedding_model: Option<String>,
    embedding_size: Option<usize>,
    defaults: ProviderDefaults,
}

impl CohereClient {
    /// Construct a client against the Cohere API or an override base URL.
    pub fn new(api_key: String, base_url: Option<String>, defaults: ProviderDefaults) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            generation_model: None,
            embedding_model: None,
            embedding_size: None,
            defaults,
        }
    }

    fn input_type(document_type: DocumentType) -> &'static str {
        match document_type {
            DocumentType::Document => "search_document",
            DocumentType::Query => "search_query",
        }
    }
}

#[async_trait]
impl LlmClient for CohereClient {
    fn set_generation_model(&mut self, model_id: String) {
        self.generation_model = Some(model_id);
    }

    fn set_embedding_model(&mut self, model_id: String, embedding_size: Option<usize>) {
        self.embedding_model = Some(model_id);
        self.embedding_size = embedding_size;
    }

    async fn generate_text(
        &self,
        prompt: &str,
        chat_history: Vec<Message>,
        max_output_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let model = self
            .generation_model
            .as_deref()
            .ok_or(LlmError::ModelNotSet {
                provider: "cohere",
                purpose: "generation",
            })?;

        // Cohere takes the current turn separately from the history and names
        // the text field `message` rather than `content`.
        let history: Vec<_> = chat_history
            .iter()
            .map(|entry| json!({"role": entry.role, "message": entry.content}))
            .collect();
        let body = json!({
            "model": model,
            "chat_history": history,
            "message": clip_input(prompt, self.defaults.max_input_characters),
            "max_tokens": max_output_tokens.unwrap_or(self.defaults.max_output_tokens),
            "temperature": temperature.unwrap_or(self.defaults.temperature),
        });

        let response = self
            .client
            .post(format!("{}/v1/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::UnexpectedStatus {
                provider: "cohere",
                status,
                body,
            };
            tracing::error!(error = %error, "Chat request failed");
            return Err(error);
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .text
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                tracing::error!(provider = "cohere", "Model returned an empty completion");
                LlmError::EmptyResponse { provider: "cohere" }
            })
    }

    async fn embed_text(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<Vec<f32>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::ModelNotSet {
                provider: "cohere",
                purpose: "embedding",
            })?;

        let body = json!({
            "model": model,
            "texts": [clip_input(text, self.defaults.max_input_characters)],
            "input_type": Self::input_type(document_type),
            "embedding_types": ["float"],
        });

        let response = self
            .client
            .post(format!("{}/v1/embed", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::UnexpectedStatus {
                provider: "cohere",
                status,
                body,
            };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let payload: EmbedResponse = response.json().await?;
        payload
            .embeddings
            .float
            .into_iter()
            .next()
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| {
                tracing::error!(provider = "cohere", "Model returned no embedding");
                LlmError::EmptyResponse { provider: "cohere" }
            })
    }

    fn construct_prompt(&self, prompt: &str, role: &str) -> Message {
        Message {
            role: role.to_string(),
            content: clip_input(prompt, self.defaults.max_input_characters).to_string(),
        }
    }
}
