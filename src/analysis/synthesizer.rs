//! Cross-source synthesis into a final report.

use crate::config::Prompts;
use crate::provider::{CompletionRequest, ReasoningProvider};
use crate::report::{Diagnostic, Report, SourceReport, SourceStatus};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Narrative, agreement and open questions across sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    pub narrative: BTreeMap<String, String>,
    pub consensus: Vec<String>,
    pub debate: Vec<String>,
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSynthesis {
    #[serde(default)]
    narrative: Option<serde_json::Value>,
    #[serde(default, alias = "consensus_areas")]
    consensus: Vec<serde_json::Value>,
    #[serde(default, alias = "debate_areas")]
    debate: Vec<serde_json::Value>,
    #[serde(default, alias = "questions")]
    follow_up_questions: Vec<serde_json::Value>,
}

fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn clean_list(values: Vec<serde_json::Value>) -> Vec<String> {
    values
        .into_iter()
        .map(value_text)
        .filter(|s| !s.is_empty())
        .collect()
}

impl Synthesis {
    /// Parse a provider payload, capping follow-up questions at `max_questions`.
    ///
    /// A bare string narrative is stored under `"overall"`.
    pub fn from_payload(payload: &serde_json::Value, max_questions: usize) -> Result<Self, String> {
        if !payload.is_object() {
            return Err("synthesis payload is not a JSON object".to_string());
        }
        let raw: RawSynthesis = serde_json::from_value(payload.clone())
            .map_err(|e| format!("unparseable synthesis payload: {}", e))?;

        let mut narrative = BTreeMap::new();
        match raw.narrative {
            Some(serde_json::Value::Object(map)) => {
                for (theme, text) in map {
                    let text = value_text(text);
                    if !text.is_empty() {
                        narrative.insert(theme, text);
                    }
                }
            }
            Some(other) => {
                let text = value_text(other);
                if !text.is_empty() {
                    narrative.insert("overall".to_string(), text);
                }
            }
            None => {}
        }

        let mut follow_up_questions = clean_list(raw.follow_up_questions);
        follow_up_questions.truncate(max_questions);

        Ok(Self {
            narrative,
            consensus: clean_list(raw.consensus),
            debate: clean_list(raw.debate),
            follow_up_questions,
        })
    }
}

/// JSON schema the reasoning provider is asked to follow for synthesis.
pub fn synthesis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "narrative": {
                "type": "object",
                "additionalProperties": { "type": "string" }
            },
            "consensus": { "type": "array", "items": { "type": "string" } },
            "debate": { "type": "array", "items": { "type": "string" } },
            "follow_up_questions": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["narrative", "consensus", "debate", "follow_up_questions"]
    })
}

/// Combines per-source results into a [`Report`].
pub struct Synthesizer {
    provider: Arc<dyn ReasoningProvider>,
    prompts: Prompts,
    max_questions: usize,
}

impl Synthesizer {
    pub fn new(provider: Arc<dyn ReasoningProvider>, max_questions: usize) -> Self {
        Self {
            provider,
            prompts: Prompts::default(),
            max_questions,
        }
    }

    /// Set custom prompts (with user-defined variables).
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Build the report for `topic`.
    ///
    /// Never fails: a provider failure leaves narrative and questions empty
    /// and records a warning diagnostic instead.
    #[instrument(skip(self, sources), fields(sources = sources.len()))]
    pub async fn synthesize(&self, topic: &str, sources: Vec<SourceReport>) -> Report {
        let mut report = Report::new(topic, sources);

        let material = render_sources(&report.sources);
        if material.is_empty() {
            info!("No source produced content, skipping synthesis");
            report.diagnostics.push(Diagnostic::info(
                None,
                "No source produced content; synthesis was skipped",
            ));
            return report;
        }

        let mut vars = HashMap::new();
        vars.insert("topic".to_string(), topic.to_string());
        vars.insert("sources".to_string(), material);
        vars.insert("max_questions".to_string(), self.max_questions.to_string());

        let request = CompletionRequest::new(
            self.prompts.render_with_custom(&self.prompts.synthesis.system, &vars),
            self.prompts.render_with_custom(&self.prompts.synthesis.user, &vars),
        )
        .with_schema("synthesis", synthesis_schema());

        let synthesis = match self.provider.complete(&request).await {
            Ok(payload) => Synthesis::from_payload(&payload, self.max_questions),
            Err(e) => Err(e.to_string()),
        };

        match synthesis {
            Ok(synthesis) => {
                debug!(
                    "Synthesis: {} themes, {} follow-up questions",
                    synthesis.narrative.len(),
                    synthesis.follow_up_questions.len()
                );
                report.narrative = synthesis.narrative;
                report.consensus = synthesis.consensus;
                report.debate = synthesis.debate;
                report.follow_up_questions = synthesis.follow_up_questions;
            }
            Err(reason) => {
                warn!("Synthesis failed, returning report without narrative: {}", reason);
                report.diagnostics.push(Diagnostic::warning(
                    None,
                    format!("Synthesis failed: {}", reason),
                ));
            }
        }

        report
    }
}

/// Render the genuine sources with content as prompt material.
fn render_sources(sources: &[SourceReport]) -> String {
    let mut out = String::new();

    for source in sources {
        if source.status != SourceStatus::Genuine || !source.result.has_content() {
            continue;
        }
        let result = &source.result;

        let _ = writeln!(out, "## {} findings", source.source);
        if !result.summary.is_empty() {
            let _ = writeln!(out, "Summary: {}", result.summary);
        }
        if !result.key_points.is_empty() {
            let _ = writeln!(out, "Key points:");
            for point in &result.key_points {
                let _ = writeln!(out, "- {}", point);
            }
        }
        if !result.topics.is_empty() {
            let topics: Vec<_> = result.topics.iter().map(String::as_str).collect();
            let _ = writeln!(out, "Topics: {}", topics.join(", "));
        }
        let _ = writeln!(out);
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AggregatedResult;
    use crate::error::ProviderError;
    use crate::provider::fake::FakeReasoningProvider;
    use crate::source::SourceKind;
    use serde_json::json;

    fn genuine(source: SourceKind, summary: &str) -> SourceReport {
        SourceReport {
            source,
            status: SourceStatus::Genuine,
            metadata: BTreeMap::new(),
            segments_analyzed: 1,
            segments_degraded: 0,
            result: AggregatedResult {
                summary: summary.to_string(),
                key_points: vec![format!("{} point", source)],
                relevance: 0.8,
                ..AggregatedResult::baseline()
            },
        }
    }

    #[test]
    fn test_string_narrative_becomes_overall() {
        let synthesis = Synthesis::from_payload(&json!({"narrative": "All good."}), 5).unwrap();
        assert_eq!(synthesis.narrative.get("overall").map(String::as_str), Some("All good."));
    }

    #[test]
    fn test_questions_are_capped_and_cleaned() {
        let payload = json!({
            "narrative": {"overall": "x", "key_themes": ""},
            "consensus_areas": ["agree"],
            "debate": [],
            "follow_up_questions": ["q1", " ", "q2", "q3", "q4"]
        });

        let synthesis = Synthesis::from_payload(&payload, 2).unwrap();
        assert_eq!(synthesis.follow_up_questions, vec!["q1", "q2"]);
        assert_eq!(synthesis.consensus, vec!["agree"]);
        assert_eq!(synthesis.narrative.len(), 1);
    }

    #[tokio::test]
    async fn test_only_genuine_sources_are_sent() {
        let provider = Arc::new(FakeReasoningProvider::new(|request| {
            assert!(request.user.contains("## research findings"));
            assert!(!request.user.contains("## video findings"));
            assert!(request.system.contains("list of 3 insightful"));
            Ok(json!({"narrative": {"overall": "Research says yes."}, "follow_up_questions": ["Why?"]}))
        }));
        let synthesizer = Synthesizer::new(provider, 3);

        let report = synthesizer
            .synthesize(
                "topic",
                vec![
                    genuine(SourceKind::Research, "Qubits scale."),
                    SourceReport::fallback(SourceKind::Video, "no videos"),
                ],
            )
            .await;

        assert_eq!(report.narrative["overall"], "Research says yes.");
        assert_eq!(report.follow_up_questions, vec!["Why?"]);
        assert!(report.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_yields_warning() {
        let provider = Arc::new(FakeReasoningProvider::failing(ProviderError::Upstream(
            "503".to_string(),
        )));
        let synthesizer = Synthesizer::new(provider, 5);

        let report = synthesizer
            .synthesize("topic", vec![genuine(SourceKind::Research, "Something.")])
            .await;

        assert!(report.narrative.is_empty());
        assert!(report.follow_up_questions.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.has_partial_data());
    }

    #[tokio::test]
    async fn test_no_content_skips_provider() {
        let provider = Arc::new(FakeReasoningProvider::returning(json!({"narrative": "unused"})));
        let synthesizer = Synthesizer::new(provider.clone(), 5);

        let report = synthesizer
            .synthesize("topic", vec![SourceReport::fallback(SourceKind::Video, "empty")])
            .await;

        assert_eq!(provider.calls(), 0);
        assert!(report.narrative.is_empty());
        assert_eq!(report.diagnostics.len(), 1);
    }
}
