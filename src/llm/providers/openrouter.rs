//! OpenRouter adapter. The gateway speaks the OpenAI wire format, so this is
//! a thin wrapper that only swaps the base URL and provider label.

use crate::llm::providers::openai::OpenAiClient;
use crate::llm::{DocumentType, LlmClient, LlmError, Message, ProviderDefaults};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// HTTP client for the OpenRouter gateway.
pub struct OpenRouterClient {
    inner: OpenAiClient,
}

impl OpenRouterClient {
    /// Construct a client against the OpenRouter gateway or an override base URL.
    pub fn new(api_key: String, base_url: Option<String>, defaults: ProviderDefaults) -> Self {
        Self {
            inner: OpenAiClient::with_label(
                "openrouter",
                api_key,
                base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                defaults,
            ),
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    fn set_generation_model(&mut self, model_id: String) {
        self.inner.set_generation_model(model_id);
    }

    fn set_embedding_model(&mut self, model_id: String, embedding_size: Option<usize>) {
        self.inner.set_embedding_model(model_id, embedding_size);
    }

    async fn generate_text(
        &self,
        prompt: &str,
        chat_history: Vec<Message>,
        max_output_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        self.inner
            .generate_text(prompt, chat_history, max_output_tokens, temperature)
            .await
    }

    async fn embed_text(
        &self,
        text: &str,
        document_type: DocumentType,
    ) -> Result<Vec<f32>, LlmError> {
        self.inner.embed_text(text, document_type).await
    }

    fn construct_prompt(&self, prompt: &str, role: &str) -> Message {
        self.inner.construct_prompt(prompt, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn delegates_chat_completions_to_the_gateway() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "routed"}}]
                }));
            })
            .await;

        let defaults = ProviderDefaults {
            max_input_characters: 1000,
            max_output_tokens: 64,
            temperature: 0.1,
        };
        let mut client = OpenRouterClient::new("key".into(), Some(server.base_url()), defaults);
        client.set_generation_model("meta-llama/llama-3.1-8b-instruct".into());

        let answer = client
            .generate_text("question?", Vec::new(), None, None)
            .await
            .unwrap();
        assert_eq!(answer, "routed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn errors_carry_the_gateway_label() {
        let defaults = ProviderDefaults {
            max_input_characters: 1000,
            max_output_tokens: 64,
            temperature: 0.1,
        };
        let client = OpenRouterClient::new("key".into(), None, defaults);
        let error = client
            .generate_text("prompt", Vec::new(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            LlmError::ModelNotSet {
                provider: "openrouter",
                ..
            }
        ));
    }
}
