//! Direct OpenAI adapter: chat completions and embeddings over HTTP.

use crate::llm::providers::{ChatCompletionResponse, EmbeddingsResponse};
use crate::llm::{DocumentType, LlmClient, LlmError, Message, ProviderDefaults, clip_input};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat roles understood by the OpenAI wire format.
pub mod roles {
    /// System instructions.
    pub const SYSTEM: &str = "system";
    /// End-user content.
    pub const USER: &str = "user";
    /// Model responses.
    pub const ASSISTANT: &str = "assistant";
}

/// HTTP client for the OpenAI API (and any service speaking its wire format).
pub struct OpenAiClient {
    client: Client,
    provider: &'static str,
    api_key: String,
    base_url: String,
    generation_model: Option<String>,
    embedding_model: Option<String>,
    embedding_size: Option<usize>,
    defaults: ProviderDefaults,
}

impl OpenAiClient {
    /// Construct a client against the OpenAI API or a compatible base URL.
    pub fn new(api_key: String, base_url: Option<String>, defaults: ProviderDefaults) -> Self {
        Self::with_label(
            "openai",
            api_key,
            base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            defaults,
        )
    }

    /// Construct a client with an explicit provider label; used by gateways
    /// that reuse the OpenAI wire format.
    pub(crate) fn with_label(
        provider: &'static str,
        api_key: String,
        base_url: String,
        defaults: ProviderDefaults,
    ) -> Self {
        Self {
            client: Client::new(),
            provider,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            generation_model: None,
            embedding_model: None,
            embedding_size: None,
            defaults,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
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
        mut chat_history: Vec<Message>,
        max_output_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let model = self
            .generation_model
            .as_deref()
            .ok_or(LlmError::ModelNotSet {
                provider: self.provider,
                purpose: "generation",
            })?;

        chat_history.push(self.construct_prompt(prompt, roles::USER));
        let body = json!({
            "model": model,
            "messages": chat_history,
            "max_tokens": max_output_tokens.unwrap_or(self.defaults.max_output_tokens),
            "temperature": temperature.unwrap_or(self.defaults.temperature),
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::UnexpectedStatus {
                provider: self.provider,
                status,
                body,
            };
            tracing::error!(error = %error, "Chat completion failed");
            return Err(error);
        }

        let payload: ChatCompletionResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                tracing::error!(provider = self.provider, "Model returned an empty completion");
                LlmError::EmptyResponse {
                    provider: self.provider,
                }
            })
    }

    async fn embed_text(
        &self,
        text: &str,
        _document_type: DocumentType,
    ) -> Result<Vec<f32>, LlmError> {
        let model = self
            .embedding_model
            .as_deref()
            .ok_or(LlmError::ModelNotSet {
                provider: self.provider,
                purpose: "embedding",
            })?;

        let body = json!({
            "model": model,
            "input": [clip_input(text, self.defaults.max_input_characters)],
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = LlmError::UnexpectedStatus {
                provider: self.provider,
                status,
                body,
            };
            tracing::error!(error = %error, "Embedding request failed");
            return Err(error);
        }

        let payload: EmbeddingsResponse = response.json().await?;
        payload
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| {
                tracing::error!(provider = self.provider, "Model returned no embedding");
                LlmError::EmptyResponse {
                    provider: self.provider,
                }
            })
    }

    fn construct_prompt(&self, prompt: &str, role: &str) -> Message {
        Message {
            role: role.to_string(),
            content: clip_input(prompt, self.defaults.max_input_characters).to_string(),
        }
    }
}
