//! Pluggable LLM provider abstraction.
//!
//! Three interchangeable backends (OpenAI, Cohere, OpenRouter) implement the
//! same capability set: configure models, generate completions, embed text,
//! and build role-tagged prompt messages. The backend is selected once at
//! startup from configuration; there is no per-call branching, and no retry
//! or rate-limit handling.

pub mod providers;

pub use providers::cohere::CohereClient;
pub use providers::openai::OpenAiClient;
pub use providers::openrouter::OpenRouterClient;

use crate::config::{Config, LlmBackend};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// A role-tagged prompt message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Message {
    /// Provider-specific role tag.
    pub role: String,
    /// Message text, already clipped to the input budget.
    pub content: String,
}

/// How an embedding input will be used; some providers embed documents and
/// queries differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    /// Text stored for later retrieval.
    Document,
    /// Text used to search stored documents.
    Query,
}

/// Errors raised by LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The selected backend has no API key configured.
    #[error("no API key configured for the {0} backend")]
    MissingApiKey(&'static str),
    /// The operation needs a model that was never configured.
    #[error("no {purpose} model configured for the {provider} backend")]
    ModelNotSet {
        /// Backend that is missing the model.
        provider: &'static str,
        /// Which capability the model was needed for.
        purpose: &'static str,
    },
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with an unexpected status code.
    #[error("unexpected {provider} response ({status}): {body}")]
    UnexpectedStatus {
        /// Backend that produced the response.
        provider: &'static str,
        /// HTTP status returned by the provider.
        status: reqwest::StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider answered 2xx but the payload carried no usable result.
    #[error("{provider} returned an empty or malformed response")]
    EmptyResponse {
        /// Backend that produced the response.
        provider: &'static str,
    },
}

/// Interface implemented by every LLM backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Set the model used for text generation.
    fn set_generation_model(&mut self, model_id: String);

    /// Set the model used for embeddings, along with its vector size.
    fn set_embedding_model(&mut self, model_id: String, embedding_size: Option<usize>);

    /// Generate a completion for `prompt`, appended to `chat_history`.
    async fn generate_text(
        &self,
        prompt: &str,
        chat_history: Vec<Message>,
        max_output_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError>;

    /// Produce an embedding vector for the given text.
    async fn embed_text(&self, text: &str, document_type: DocumentType)
    -> Result<Vec<f32>, LlmError>;

    /// Build a role-tagged message with the provider's input clipping applied.
    fn construct_prompt(&self, prompt: &str, role: &str) -> Message;
}

/// Request defaults shared by all providers, sourced from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefaults {
    /// Maximum characters forwarded per input.
    pub max_input_characters: usize,
    /// Default completion token budget.
    pub max_output_tokens: u32,
    /// Default sampling temperature.
    pub temperature: f32,
}

impl ProviderDefaults {
    /// Extract the provider defaults from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_input_characters: config.input_max_characters,
            max_output_tokens: config.generation_max_tokens,
            temperature: config.generation_temperature,
        }
    }
}

/// Clip provider input to a character budget and trim surrounding whitespace.
pub(crate) fn clip_input(text: &str, max_characters: usize) -> &str {
    match text.char_indices().nth(max_characters) {
        Some((byte_index, _)) => text[..byte_index].trim(),
        None => text.trim(),
    }
}

/// Construct the configured generation backend with its model applied.
pub fn build_generation_client(config: &Config) -> Result<Box<dyn LlmClient>, LlmError> {
    let mut client = build(config, config.generation_backend)?;
    if let Some(model) = &config.generation_model_id {
        client.set_generation_model(model.clone());
    }
    Ok(client)
}

/// Construct the configured embedding backend with its model applied.
pub fn build_embedding_client(config: &Config) -> Result<Box<dyn LlmClient>, LlmError> {
    let mut client = build(config, config.embedding_backend)?;
    if let Some(model) = &config.embedding_model_id {
        client.set_embedding_model(model.clone(), config.embedding_model_size);
    }
    Ok(client)
}

fn build(config: &Config, backend: LlmBackend) -> Result<Box<dyn LlmClient>, LlmError> {
    let defaults = ProviderDefaults::from_config(config);
    match backend {
        LlmBackend::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(LlmError::MissingApiKey("openai"))?;
            Ok(Box::new(OpenAiClient::new(
                api_key,
                config.openai_api_url.clone(),
                defaults,
            )))
        }
        LlmBackend::Cohere => {
            let api_key = config
                .cohere_api_key
                .clone()
                .ok_or(LlmError::MissingApiKey("cohere"))?;
            Ok(Box::new(CohereClient::new(api_key, None, defaults)))
        }
        // OpenRouter reuses the OpenAI credentials and wire format.
        LlmBackend::OpenRouter => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or(LlmError::MissingApiKey("openrouter"))?;
            Ok(Box::new(OpenRouterClient::new(
                api_key,
                config.openai_api_url.clone(),
                defaults,
            )))
        }
    }
}
