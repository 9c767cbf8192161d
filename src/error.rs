//! Error types for Ariel.

use thiserror::Error;

/// Library-level error type for Ariel operations.
#[derive(Error, Debug)]
pub enum ArielError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

impl ArielError {
    /// Whether the pipeline can keep going after this error.
    ///
    /// Only input validation and configuration problems abort a run.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ArielError::InvalidInput(_) | ArielError::Config(_))
    }
}

/// Failure of an external provider call (reasoning, research or video).
///
/// All variants are recoverable at the orchestrator level: they degrade
/// the affected segment or source instead of failing the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Timed out")]
    Timeout,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return ProviderError::Timeout;
        }
        match e.status() {
            Some(status) if status.as_u16() == 401 || status.as_u16() == 403 => {
                ProviderError::Auth(e.to_string())
            }
            Some(_) => ProviderError::Upstream(e.to_string()),
            None if e.is_decode() => ProviderError::MalformedResponse(e.to_string()),
            None => ProviderError::Network(e.to_string()),
        }
    }
}

impl From<async_openai::error::OpenAIError> for ProviderError {
    fn from(e: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        match e {
            OpenAIError::Reqwest(inner) => inner.into(),
            OpenAIError::ApiError(api) => {
                let code = api.code.clone().unwrap_or_default();
                let kind = api.r#type.clone().unwrap_or_default();
                if code.contains("invalid_api_key")
                    || kind.contains("authentication")
                    || api.message.contains("API key")
                {
                    ProviderError::Auth(api.message)
                } else {
                    ProviderError::Upstream(api.message)
                }
            }
            OpenAIError::JSONDeserialize(inner) => {
                ProviderError::MalformedResponse(inner.to_string())
            }
            other => ProviderError::Upstream(other.to_string()),
        }
    }
}

/// Result type alias for Ariel operations.
pub type Result<T> = std::result::Result<T, ArielError>;
