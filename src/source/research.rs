//! Research source: a web research API queried per topic.

use super::{validate_topic, SourceAdapter, SourceKind, SourceResult};
use crate::chunking::Chunker;
use crate::config::{Credentials, Prompts, ResearchSettings};
use crate::error::{ArielError, ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Structured answer of a research provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchResponse {
    pub summary: String,
    pub key_insights: Vec<String>,
    pub sources: Vec<String>,
    pub citations: Vec<String>,
}

/// Trait for research providers.
#[async_trait]
pub trait ResearchProvider: Send + Sync {
    /// Research a topic.
    async fn search(&self, topic: &str) -> std::result::Result<ResearchResponse, ProviderError>;
}

/// Research provider backed by the Perplexity Sonar chat completions API.
pub struct PerplexityResearchProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    prompts: Prompts,
}

impl PerplexityResearchProvider {
    pub fn new(
        settings: &ResearchSettings,
        credentials: &Credentials,
        prompts: Prompts,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArielError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            model: settings.model.clone(),
            api_key: credentials.research_api_key.clone(),
            max_tokens: settings.max_tokens,
            prompts,
        })
    }
}

#[async_trait]
impl ResearchProvider for PerplexityResearchProvider {
    #[instrument(skip(self), fields(model = %self.model))]
    async fn search(&self, topic: &str) -> std::result::Result<ResearchResponse, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            ProviderError::Auth("PERPLEXITY_API_KEY not set and no research.api_key configured".to_string())
        })?;

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.research.user, &vars);

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_tokens,
        });

        debug!("Calling research API at {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProviderError::Auth(format!("Research API rejected credentials ({})", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(ProviderError::Upstream(format!(
                "Research API returned {}: {}",
                status, preview
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                ProviderError::MalformedResponse("Missing choices[0].message.content".to_string())
            })?;

        let mut research = parse_research_content(content);

        if let Some(citations) = json["citations"].as_array() {
            research
                .citations
                .extend(citations.iter().filter_map(|c| c.as_str()).map(str::to_string));
        }

        info!(
            "Research returned {} insights, {} citations",
            research.key_insights.len(),
            research.citations.len()
        );

        Ok(research)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Summary,
    KeyInsights,
    Sources,
    Citations,
}

const SECTION_HEADERS: [(&str, Section); 4] = [
    ("summary", Section::Summary),
    ("key insights", Section::KeyInsights),
    ("sources", Section::Sources),
    ("citations", Section::Citations),
];

/// Parse a sectioned research answer (`Summary:`, `Key Insights:`, `Sources:`,
/// `Citations:`) into a [`ResearchResponse`].
///
/// Content without any recognizable section header becomes the summary.
pub fn parse_research_content(content: &str) -> ResearchResponse {
    let mut research = ResearchResponse::default();
    let mut summary_parts: Vec<String> = Vec::new();
    let mut current: Option<Section> = None;
    let mut saw_header = false;

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((section, rest)) = parse_header(line) {
            current = Some(section);
            saw_header = true;
            if !rest.is_empty() {
                match section {
                    Section::Summary => summary_parts.push(rest.to_string()),
                    _ => push_item(&mut research, section, rest),
                }
            }
            continue;
        }

        match current {
            Some(Section::Summary) => summary_parts.push(line.to_string()),
            Some(section) => {
                if let Some(item) = strip_bullet(line) {
                    push_item(&mut research, section, item);
                }
            }
            None => {}
        }
    }

    research.summary = if saw_header {
        summary_parts.join(" ")
    } else {
        content.split_whitespace().collect::<Vec<_>>().join(" ")
    };

    research
}

fn push_item(research: &mut ResearchResponse, section: Section, item: &str) {
    let item = item.trim();
    if item.is_empty() {
        return;
    }
    match section {
        Section::KeyInsights => research.key_insights.push(item.to_string()),
        Section::Sources => research.sources.push(item.to_string()),
        Section::Citations => research.citations.push(item.to_string()),
        Section::Summary => {}
    }
}

/// Recognize a section header line, returning the section and any inline text.
fn parse_header(line: &str) -> Option<(Section, &str)> {
    let stripped = line.trim_start_matches(|c: char| c == '#' || c == '*' || c.is_whitespace());
    let stripped = strip_numbering(stripped).unwrap_or(stripped);
    let stripped = stripped.trim_start_matches(|c: char| c == '*' || c.is_whitespace());

    for (name, section) in SECTION_HEADERS {
        let Some(head) = stripped.get(..name.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(name) {
            continue;
        }
        let rest = &stripped[name.len()..];
        let rest_trimmed = rest.trim_start_matches('*');
        if let Some(after_colon) = rest_trimmed.strip_prefix(':') {
            let inline = after_colon.trim_matches(|c: char| c == '*' || c.is_whitespace());
            return Some((section, inline));
        }
        if rest.trim_matches(|c: char| c == '*' || c == '#' || c.is_whitespace()).is_empty() {
            return Some((section, ""));
        }
    }
    None
}

/// Strip a leading `1.` / `2)` enumeration marker.
fn strip_numbering(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .map(str::trim_start)
}

/// Strip a list bullet, returning None when the line is not a list item.
fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• "] {
        if let Some(item) = line.strip_prefix(marker) {
            return Some(item.trim());
        }
    }
    strip_numbering(line)
}

/// Adapter turning research answers into chunked source results.
pub struct ResearchAdapter {
    provider: Arc<dyn ResearchProvider>,
    chunker: Chunker,
}

impl ResearchAdapter {
    pub fn new(provider: Arc<dyn ResearchProvider>, chunker: Chunker) -> Self {
        Self { provider, chunker }
    }
}

#[async_trait]
impl SourceAdapter for ResearchAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Research
    }

    #[instrument(skip(self))]
    async fn fetch(&self, topic: &str) -> Result<SourceResult> {
        let topic = validate_topic(topic)?;
        let research = self.provider.search(topic).await?;

        let mut text = research.summary.clone();
        for insight in &research.key_insights {
            text.push('\n');
            text.push_str(insight);
        }

        let mut result = SourceResult::new(SourceKind::Research, self.chunker.split(&text));
        for (i, source) in research.sources.iter().enumerate() {
            result.metadata.insert(format!("source.{}", i), source.clone());
        }
        for (i, citation) in research.citations.iter().enumerate() {
            result.metadata.insert(format!("citation.{}", i), citation.clone());
        }

        debug!("Research produced {} segments", result.segments.len());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingMode;
    use crate::provider::fake::StaticResearchProvider;

    #[test]
    fn test_parse_sectioned_content() {
        let content = r#"1. Summary: Quantum computers use qubits.
They exploit superposition.

2. Key Insights:
- Error correction is the main hurdle
* Hardware is scaling quickly

3. Sources:
- Nature, 2024
4. Citations:
- "Logical qubits demonstrated" (Google)"#;

        let research = parse_research_content(content);
        assert_eq!(research.summary, "Quantum computers use qubits. They exploit superposition.");
        assert_eq!(
            research.key_insights,
            vec!["Error correction is the main hurdle", "Hardware is scaling quickly"]
        );
        assert_eq!(research.sources, vec!["Nature, 2024"]);
        assert_eq!(research.citations, vec!["\"Logical qubits demonstrated\" (Google)"]);
    }

    #[test]
    fn test_parse_markdown_headers() {
        let content = "## Summary\nA short overview.\n\n**Key Insights:**\n1. First\n2. Second";

        let research = parse_research_content(content);
        assert_eq!(research.summary, "A short overview.");
        assert_eq!(research.key_insights, vec!["First", "Second"]);
    }

    #[test]
    fn test_unstructured_content_becomes_summary() {
        let research = parse_research_content("Just a plain\nanswer with no sections.");
        assert_eq!(research.summary, "Just a plain answer with no sections.");
        assert!(research.key_insights.is_empty());
    }

    #[test]
    fn test_header_requires_colon_or_line_end() {
        assert!(parse_header("Sources of error are many").is_none());
        assert_eq!(parse_header("Sources:").map(|(s, _)| s), Some(Section::Sources));
    }

    #[tokio::test]
    async fn test_adapter_chunks_and_collects_metadata() {
        let provider = StaticResearchProvider::new(ResearchResponse {
            summary: "one two three four".to_string(),
            key_insights: vec!["five six".to_string()],
            sources: vec!["Nature".to_string()],
            citations: vec!["https://example.org".to_string()],
        });
        let adapter = ResearchAdapter::new(Arc::new(provider), Chunker::new(ChunkingMode::Words, 3));

        let result = adapter.fetch("quantum").await.unwrap();
        assert_eq!(result.source, SourceKind::Research);
        assert_eq!(result.segments, vec!["one two three", "four five six"]);
        assert_eq!(result.metadata.get("source.0").map(String::as_str), Some("Nature"));
        assert_eq!(
            result.metadata.get("citation.0").map(String::as_str),
            Some("https://example.org")
        );
    }

    #[tokio::test]
    async fn test_adapter_rejects_blank_topic() {
        let provider = StaticResearchProvider::new(ResearchResponse::default());
        let adapter = ResearchAdapter::new(Arc::new(provider), Chunker::new(ChunkingMode::Words, 3));

        let err = adapter.fetch("   ").await.unwrap_err();
        assert!(matches!(err, ArielError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_error() {
        let provider = PerplexityResearchProvider::new(
            &ResearchSettings::default(),
            &Credentials::default(),
            Prompts::default(),
            Duration::from_secs(5),
        )
        .unwrap();

        let err = provider.search("quantum").await.unwrap_err();
        assert!(matches!(err, ProviderError::Auth(_)));
    }
}
