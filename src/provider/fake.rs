//! Deterministic in-process providers.
//!
//! Useful for testing and offline runs: every provider returns canned output,
//! optionally after a delay, and never touches the network.

use super::{CompletionRequest, ReasoningProvider};
use crate::error::ProviderError;
use crate::source::{ResearchProvider, ResearchResponse, VideoItem, VideoProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Handler = Box<dyn Fn(&CompletionRequest) -> Result<serde_json::Value, ProviderError> + Send + Sync>;

/// Reasoning provider answering every request through a closure.
pub struct FakeReasoningProvider {
    handler: Handler,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeReasoningProvider {
    /// Answer requests with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<serde_json::Value, ProviderError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always return the same payload.
    pub fn returning(value: serde_json::Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Always fail with the same error.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningProvider for FakeReasoningProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<serde_json::Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(request)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Research provider returning a canned response or error.
pub struct StaticResearchProvider {
    response: Result<ResearchResponse, ProviderError>,
    delay: Option<Duration>,
}

impl StaticResearchProvider {
    pub fn new(response: ResearchResponse) -> Self {
        Self {
            response: Ok(response),
            delay: None,
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            response: Err(error),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ResearchProvider for StaticResearchProvider {
    async fn search(&self, _topic: &str) -> Result<ResearchResponse, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

/// Video provider returning canned videos or an error.
pub struct StaticVideoProvider {
    response: Result<Vec<VideoItem>, ProviderError>,
    delay: Option<Duration>,
}

impl StaticVideoProvider {
    pub fn new(videos: Vec<VideoItem>) -> Self {
        Self {
            response: Ok(videos),
            delay: None,
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            response: Err(error),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl VideoProvider for StaticVideoProvider {
    async fn search(&self, _topic: &str) -> Result<Vec<VideoItem>, ProviderError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}
