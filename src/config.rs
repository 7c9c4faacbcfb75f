use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the pipeline server.
///
/// Loaded once at startup and passed explicitly (behind an `Arc`) to every
/// component that needs it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Human-readable application name used by the welcome endpoint.
    pub app_name: String,
    /// Application version string used by the welcome endpoint.
    pub app_version: String,
    /// MIME types accepted by the upload endpoint.
    pub file_allowed_types: Vec<String>,
    /// Maximum accepted upload size, in megabytes.
    pub file_max_size_mb: u64,
    /// Buffer size (bytes) used while streaming uploads to disk.
    pub file_chunk_size: usize,
    /// Base directory where uploaded files are stored, one subdirectory per project.
    pub files_dir: PathBuf,
    /// MongoDB connection string.
    pub mongodb_url: String,
    /// Name of the MongoDB database holding projects, assets, and chunks.
    pub mongodb_database: String,
    /// Backend used for text generation.
    pub generation_backend: LlmBackend,
    /// Backend used for text embeddings.
    pub embedding_backend: LlmBackend,
    /// API key for OpenAI (also used for OpenRouter).
    pub openai_api_key: Option<String>,
    /// Base URL override for the OpenAI-compatible API.
    pub openai_api_url: Option<String>,
    /// API key for Cohere.
    pub cohere_api_key: Option<String>,
    /// Model identifier used for text generation.
    pub generation_model_id: Option<String>,
    /// Model identifier used for embeddings.
    pub embedding_model_id: Option<String>,
    /// Dimensionality of the embedding vectors produced by the embedding model.
    pub embedding_model_size: Option<usize>,
    /// Maximum number of characters forwarded to a provider per input.
    pub input_max_characters: usize,
    /// Default token budget for generated completions.
    pub generation_max_tokens: u32,
    /// Default sampling temperature for completions.
    pub generation_temperature: f32,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Remote LLM backends the provider factory can construct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Direct OpenAI API access.
    OpenAi,
    /// Direct Cohere API access.
    Cohere,
    /// Unified gateway speaking the OpenAI wire format.
    OpenRouter,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app_name: load_env("APP_NAME")?,
            app_version: load_env("APP_VERSION")?,
            file_allowed_types: parse_list(&load_env("FILE_ALLOWED_TYPES")?),
            file_max_size_mb: parse_env("FILE_MAX_SIZE")?,
            file_chunk_size: parse_env("FILE_DEFAULT_CHUNK_SIZE")?,
            files_dir: load_env_optional("FILES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("assets/files")),
            mongodb_url: load_env("MONGODB_URL")?,
            mongodb_database: load_env("MONGODB_DATABASE")?,
            generation_backend: load_env("GENERATION_BACKEND")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("GENERATION_BACKEND".to_string()))?,
            embedding_backend: load_env("EMBEDDING_BACKEND")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_BACKEND".to_string()))?,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_api_url: load_env_optional("OPENAI_API_URL"),
            cohere_api_key: load_env_optional("COHERE_API_KEY"),
            generation_model_id: load_env_optional("GENERATION_MODEL_ID"),
            embedding_model_id: load_env_optional("EMBEDDING_MODEL_ID"),
            embedding_model_size: parse_env_optional("EMBEDDING_MODEL_SIZE")?,
            input_max_characters: parse_env_optional("INPUT_DEFAULT_MAX_CHARACTERS")?
                .unwrap_or(1000),
            generation_max_tokens: parse_env_optional("GENERATION_DEFAULT_MAX_TOKENS")?
                .unwrap_or(1000),
            generation_temperature: parse_env_optional("GENERATION_DEFAULT_TEMPERATURE")?
                .unwrap_or(0.1),
            server_port: parse_env_optional("SERVER_PORT")?,
        })
    }

    /// Maximum accepted upload size expressed in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.file_max_size_mb * 1024 * 1024
    }

    /// Whether the given MIME type is on the upload allow-list.
    pub fn is_allowed_type(&self, mime: &str) -> bool {
        self.file_allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}

/// Load the `.env` file (when present) and build the configuration.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        app = %config.app_name,
        database = %config.mongodb_database,
        generation_backend = ?config.generation_backend,
        embedding_backend = ?config.embedding_backend,
        "Loaded configuration"
    );
    Ok(config)
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<T, ConfigError> {
    load_env(key)?
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_env_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Split a comma-separated environment value into trimmed, non-empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

impl std::str::FromStr for LlmBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "cohere" => Ok(Self::Cohere),
            "openrouter" => Ok(Self::OpenRouter),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list_trims_and_drops_empties() {
        let parsed = parse_list("text/plain, application/pdf, ,");
        assert_eq!(parsed, vec!["text/plain", "application/pdf"]);
    }

    #[test]
    fn backend_parsing_is_case_insensitive() {
        assert_eq!("OPENAI".parse::<LlmBackend>(), Ok(LlmBackend::OpenAi));
        assert_eq!("Cohere".parse::<LlmBackend>(), Ok(LlmBackend::Cohere));
        assert_eq!(
            "openrouter".parse::<LlmBackend>(),
            Ok(LlmBackend::OpenRouter)
        );
        assert!("anthropic".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn max_file_size_scales_to_bytes() {
        let config = test_config();
        assert_eq!(config.max_file_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn allowed_type_check_ignores_case() {
        let config = test_config();
        assert!(config.is_allowed_type("Text/Plain"));
        assert!(!config.is_allowed_type("image/png"));
    }

    fn test_config() -> Config {
        Config {
            app_name: "ragpipe".into(),
            app_version: "0.1.0".into(),
            file_allowed_types: vec!["text/plain".into(), "application/pdf".into()],
            file_max_size_mb: 10,
            file_chunk_size: 512 * 1024,
            files_dir: PathBuf::from("assets/files"),
            mongodb_url: "mongodb://localhost:27017".into(),
            mongodb_database: "ragpipe".into(),
            generation_backend: LlmBackend::OpenAi,
            embedding_backend: LlmBackend::Cohere,
            openai_api_key: Some("test-key".into()),
            openai_api_url: None,
            cohere_api_key: Some("test-key".into()),
            generation_model_id: Some("gpt-4o-mini".into()),
            embedding_model_id: Some("text-embedding-3-small".into()),
            embedding_model_size: Some(1536),
            input_max_characters: 1000,
            generation_max_tokens: 1000,
            generation_temperature: 0.1,
            server_port: None,
        }
    }
}
