//! OpenAI client construction from explicit credentials.

use crate::error::{ArielError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (2 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Create an OpenAI client with the given key, optional base URL and timeout.
///
/// The key is passed explicitly so no client ever reads process-wide state.
pub fn create_client(
    api_key: &str,
    api_base: Option<&str>,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ArielError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
