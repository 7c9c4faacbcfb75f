//! Provider adapters for the supported LLM backends.

pub mod cohere;
pub mod openai;
pub mod openrouter;

use serde::Deserialize;

/// Response shape of an OpenAI-compatible `/chat/completions` call.
///
/// Every field is optional so that malformed payloads deserialize cleanly and
/// surface as [`crate::llm::LlmError::EmptyResponse`] instead of a decode error.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    #[serde(default)]
    pub message: Option<ChatMessageBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageBody {
    #[serde(default)]
    pub content: Option<String>,
}

/// Response shape of an OpenAI-compatible `/embeddings` call.
#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingsResponse {
    #[serde(default)]
    pub data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmbeddingRow {
    #[serde(default)]
    pub embedding: Vec<f32>,
}
