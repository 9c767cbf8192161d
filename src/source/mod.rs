//! Information source abstraction for Ariel.
//!
//! Provides a trait-based interface over the external sources a topic report
//! draws from (research engine, video platform). Each adapter returns a
//! normalized [`SourceResult`] of already-chunked text segments.

mod research;
mod video;

pub use research::{
    parse_research_content, PerplexityResearchProvider, ResearchAdapter, ResearchProvider,
    ResearchResponse,
};
pub use video::{vtt_to_text, VideoAdapter, VideoItem, VideoProvider, YtDlpVideoProvider};

use crate::error::{ArielError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of information source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Research,
    Video,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Research => write!(f, "research"),
            SourceKind::Video => write!(f, "video"),
        }
    }
}

/// Normalized output of one source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Which source produced this result.
    pub source: SourceKind,
    /// Ordered, already-chunked text segments.
    pub segments: Vec<String>,
    /// Source-specific metadata (title, channel, url, citations...).
    pub metadata: BTreeMap<String, String>,
}

impl SourceResult {
    pub fn new(source: SourceKind, segments: Vec<String>) -> Self {
        Self {
            source,
            segments,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Trait for information source adapters.
///
/// Adapters must not retry internally; retry and timeout policy belongs to
/// the orchestrator.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The kind of source this adapter fetches from.
    fn kind(&self) -> SourceKind;

    /// Fetch and normalize everything the source has on `topic`.
    async fn fetch(&self, topic: &str) -> Result<SourceResult>;
}

/// Validate a topic string, returning it trimmed.
pub fn validate_topic(topic: &str) -> Result<&str> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(ArielError::InvalidInput(
            "Topic must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_topic() {
        assert_eq!(validate_topic("  quantum computing ").unwrap(), "quantum computing");
        assert!(matches!(validate_topic(""), Err(ArielError::InvalidInput(_))));
        assert!(matches!(validate_topic(" \t\n"), Err(ArielError::InvalidInput(_))));
    }

    #[test]
    fn test_source_kind_serde() {
        assert_eq!(serde_json::to_string(&SourceKind::Video).unwrap(), "\"video\"");
        assert_eq!(SourceKind::Research.to_string(), "research");
    }
}
