//! External reasoning provider abstraction.
//!
//! The pipeline only ever talks to a [`ReasoningProvider`]; the live OpenAI
//! implementation and the deterministic fakes are interchangeable.

pub mod fake;
mod openai;

pub use openai::OpenAIReasoningProvider;

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// JSON schema the provider is asked to conform to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    /// Schema name (letters, digits, underscores).
    pub name: String,
    /// JSON schema document.
    pub schema: serde_json::Value,
}

/// A single structured completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instructions.
    pub system: String,
    /// User content.
    pub user: String,
    /// Schema for forced structured output.
    pub schema: Option<ResponseSchema>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            schema: None,
        }
    }

    /// Force structured output conforming to `schema`.
    pub fn with_schema(mut self, name: &str, schema: serde_json::Value) -> Self {
        self.schema = Some(ResponseSchema {
            name: name.to_string(),
            schema,
        });
        self
    }
}

/// Trait for reasoning (LLM) providers returning structured payloads.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Run one completion and return the parsed JSON payload.
    ///
    /// The payload is not validated against the schema; callers repair it.
    async fn complete(&self, request: &CompletionRequest) -> Result<serde_json::Value, ProviderError>;

    /// Provider name for diagnostics.
    fn name(&self) -> &str;
}

/// Extract a JSON object from model output that may be wrapped in prose or code fences.
pub fn parse_json_payload(content: &str) -> Result<serde_json::Value, ProviderError> {
    let start = content.find('{');
    let end = content.rfind('}');

    let json_str = match (start, end) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => content,
    };

    serde_json::from_str(json_str).map_err(|e| {
        let preview: String = content.chars().take(200).collect();
        ProviderError::MalformedResponse(format!("{}. Response was: {}", e, preview))
    })
}
