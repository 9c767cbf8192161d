//! OpenAI chat completions as a reasoning provider.

use super::{parse_json_payload, CompletionRequest, ReasoningProvider};
use crate::config::{Credentials, ReasoningSettings};
use crate::error::{ProviderError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Reasoning provider backed by the OpenAI chat completions API.
pub struct OpenAIReasoningProvider {
    /// None when no API key is configured; every call then fails with `Auth`.
    client: Option<async_openai::Client<async_openai::config::OpenAIConfig>>,
    model: String,
    temperature: f32,
}

impl OpenAIReasoningProvider {
    /// Create a provider from settings and resolved credentials.
    pub fn new(settings: &ReasoningSettings, credentials: &Credentials) -> Result<Self> {
        let client = match &credentials.openai_api_key {
            Some(key) => Some(create_client(
                key,
                settings.api_base.as_deref(),
                Duration::from_secs(settings.request_timeout_seconds),
            )?),
            None => None,
        };

        Ok(Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        })
    }

    /// Model used for completions.
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn build_error(e: impl std::fmt::Display) -> ProviderError {
    ProviderError::Upstream(format!("Failed to build request: {}", e))
}

#[async_trait]
impl ReasoningProvider for OpenAIReasoningProvider {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<serde_json::Value, ProviderError> {
        let client = self.client.as_ref().ok_or_else(|| {
            ProviderError::Auth("OPENAI_API_KEY not set and no reasoning.api_key configured".to_string())
        })?;

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system.clone())
                .build()
                .map_err(build_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user.clone())
                .build()
                .map_err(build_error)?
                .into(),
        ];

        let response_format = match &request.schema {
            Some(schema) => ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: None,
                    name: schema.name.clone(),
                    schema: Some(schema.schema.clone()),
                    strict: Some(false),
                },
            },
            None => ResponseFormat::JsonObject,
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .response_format(response_format)
            .build()
            .map_err(build_error)?;

        let response = client.chat().create(chat_request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| ProviderError::MalformedResponse("Empty response from LLM".to_string()))?;

        debug!("LLM response: {}", content.chars().take(300).collect::<String>());

        parse_json_payload(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let provider =
            OpenAIReasoningProvider::new(&ReasoningSettings::default(), &Credentials::default())
                .unwrap();
        assert_eq!(provider.model(), "gpt-4o-mini");

        let request = CompletionRequest::new("system", "user");
        let err = provider.complete(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
    }
}
