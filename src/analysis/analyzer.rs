//! Per-segment analysis through a reasoning provider.

use super::{normalize_complexity, SegmentJudgment, Sentiment};
use crate::config::Prompts;
use crate::provider::{CompletionRequest, ReasoningProvider};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns one text segment into a validated [`SegmentJudgment`].
#[derive(Clone)]
pub struct SegmentAnalyzer {
    provider: Arc<dyn ReasoningProvider>,
    prompts: Prompts,
}

impl SegmentAnalyzer {
    pub fn new(provider: Arc<dyn ReasoningProvider>) -> Self {
        Self {
            provider,
            prompts: Prompts::default(),
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Analyze a segment in the context of `topic`.
    ///
    /// Never fails: provider errors and invalid payloads yield the
    /// low-confidence [`SegmentJudgment::fallback`].
    pub async fn analyze(&self, segment: &str, topic: &str) -> SegmentJudgment {
        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        vars.insert("segment".to_string(), segment.to_string());

        let request = CompletionRequest::new(
            self.prompts.render_with_custom(&self.prompts.analysis.system, &vars),
            self.prompts.render_with_custom(&self.prompts.analysis.user, &vars),
        )
        .with_schema("segment_judgment", segment_judgment_schema());

        let payload = match self.provider.complete(&request).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Segment analysis failed, using default judgment: {}", e);
                return SegmentJudgment::fallback();
            }
        };

        match judgment_from_payload(&payload) {
            Ok(judgment) => {
                debug!(
                    "Segment judged: {} key points, {} topics",
                    judgment.key_points.len(),
                    judgment.topics.len()
                );
                judgment
            }
            Err(reason) => {
                warn!("Invalid segment judgment, using default: {}", reason);
                SegmentJudgment::fallback()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSentiment {
    #[serde(default)]
    positive: f64,
    #[serde(default)]
    negative: f64,
    #[serde(default)]
    neutral: f64,
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    summary: Option<String>,
    key_points: Option<Vec<String>>,
    #[serde(alias = "key_topics")]
    topics: Option<Vec<String>>,
    sentiment: Option<RawSentiment>,
    technical_complexity: Option<f64>,
    #[serde(default, alias = "speakers")]
    speaker_info: Option<BTreeMap<String, serde_json::Value>>,
}

/// Validate and repair a provider payload into a judgment.
///
/// `summary`, `key_points`, `topics`, `sentiment` and `technical_complexity`
/// are required; `speaker_info` is optional. Sentiment is renormalized and
/// complexity rescaled into [0, 1].
pub fn judgment_from_payload(payload: &serde_json::Value) -> Result<SegmentJudgment, String> {
    let raw: RawJudgment =
        serde_json::from_value(payload.clone()).map_err(|e| format!("unparseable payload: {}", e))?;

    let missing = |field: &str| format!("missing required field '{}'", field);

    let summary = raw.summary.ok_or_else(|| missing("summary"))?;
    let key_points = raw.key_points.ok_or_else(|| missing("key_points"))?;
    let topics = raw.topics.ok_or_else(|| missing("topics"))?;
    let sentiment = raw.sentiment.ok_or_else(|| missing("sentiment"))?;
    let complexity = raw
        .technical_complexity
        .ok_or_else(|| missing("technical_complexity"))?;

    let speakers = raw
        .speaker_info
        .unwrap_or_default()
        .into_iter()
        .map(|(speaker, role)| {
            let role = match role {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (speaker, role)
        })
        .collect();

    Ok(SegmentJudgment {
        summary: summary.trim().to_string(),
        key_points: key_points
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        topics: topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<BTreeSet<_>>(),
        sentiment: Sentiment {
            positive: sentiment.positive,
            negative: sentiment.negative,
            neutral: sentiment.neutral,
        }
        .normalized(),
        technical_complexity: normalize_complexity(complexity),
        speakers,
        fallback: false,
    })
}

/// JSON schema the reasoning provider is asked to follow.
pub fn segment_judgment_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "summary": { "type": "string" },
            "key_points": { "type": "array", "items": { "type": "string" } },
            "topics": { "type": "array", "items": { "type": "string" } },
            "sentiment": {
                "type": "object",
                "properties": {
                    "positive": { "type": "number" },
                    "negative": { "type": "number" },
                    "neutral": { "type": "number" }
                },
                "required": ["positive", "negative", "neutral"]
            },
            "technical_complexity": { "type": "number" },
            "speaker_info": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            }
        },
        "required": ["summary", "key_points", "topics", "sentiment", "technical_complexity"]
    })
}
