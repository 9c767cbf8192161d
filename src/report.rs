//! The final synthesized report of one pipeline run.

use crate::analysis::AggregatedResult;
use crate::source::SourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Whether a source contributed real data or the neutral fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceStatus {
    Genuine,
    Fallback { reason: String },
}

impl SourceStatus {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SourceStatus::Fallback { .. })
    }
}

/// One source's contribution to a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceKind,
    pub status: SourceStatus,
    pub metadata: BTreeMap<String, String>,
    /// Segments sent to the analyzer.
    pub segments_analyzed: usize,
    /// Segments that fell back to the default judgment.
    pub segments_degraded: usize,
    pub result: AggregatedResult,
}

impl SourceReport {
    /// Report for a source that produced nothing usable.
    pub fn fallback(source: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            source,
            status: SourceStatus::Fallback {
                reason: reason.into(),
            },
            metadata: BTreeMap::new(),
            segments_analyzed: 0,
            segments_degraded: 0,
            result: AggregatedResult::baseline(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Non-fatal problem noticed during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceKind>,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(source: Option<SourceKind>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            source,
            message: message.into(),
        }
    }

    pub fn info(source: Option<SourceKind>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            source,
            message: message.into(),
        }
    }
}

/// Cross-source report for a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub topic: String,
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    /// Theme → description.
    pub narrative: BTreeMap<String, String>,
    pub consensus: Vec<String>,
    pub debate: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Empty report for `topic` carrying the given sources.
    pub fn new(topic: impl Into<String>, sources: Vec<SourceReport>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.into(),
            generated_at: Utc::now(),
            sources,
            narrative: BTreeMap::new(),
            consensus: Vec::new(),
            debate: Vec::new(),
            follow_up_questions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == kind)
    }

    /// True if any source fell back or any warning was recorded.
    pub fn has_partial_data(&self) -> bool {
        self.sources.iter().any(|s| s.status.is_fallback())
            || self
                .diagnostics
                .iter()
                .any(|d| d.severity == Severity::Warning)
    }

    /// Plain-text rendering for terminals.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Topic: {}", self.topic);
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));

        for source in &self.sources {
            let _ = writeln!(out);
            match &source.status {
                SourceStatus::Genuine => {
                    let _ = writeln!(
                        out,
                        "== {} ({} segments, {} degraded) ==",
                        source.source, source.segments_analyzed, source.segments_degraded
                    );
                }
                SourceStatus::Fallback { reason } => {
                    let _ = writeln!(out, "== {} (no data: {}) ==", source.source, reason);
                }
            }

            let result = &source.result;
            if !result.summary.is_empty() {
                let _ = writeln!(out, "{}", result.summary);
            }
            for point in &result.key_points {
                let _ = writeln!(out, "  - {}", point);
            }
            if !result.topics.is_empty() {
                let topics: Vec<_> = result.topics.iter().map(String::as_str).collect();
                let _ = writeln!(out, "Topics: {}", topics.join(", "));
            }
            let _ = writeln!(
                out,
                "Sentiment: +{:.2} / -{:.2} / ={:.2}  Complexity: {:.2}  Relevance: {:.2}",
                result.sentiment.positive,
                result.sentiment.negative,
                result.sentiment.neutral,
                result.technical_complexity,
                result.relevance
            );
        }

        if !self.narrative.is_empty() {
            let _ = writeln!(out, "\n== Synthesis ==");
            for (theme, text) in &self.narrative {
                let _ = writeln!(out, "{}: {}", theme, text);
            }
        }

        for (title, items) in [
            ("Consensus", &self.consensus),
            ("Debate", &self.debate),
            ("Follow-up questions", &self.follow_up_questions),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "\n{}:", title);
            for (i, item) in items.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, item);
            }
        }

        if !self.diagnostics.is_empty() {
            let _ = writeln!(out, "\nNotes:");
            for d in &self.diagnostics {
                match d.source {
                    Some(source) => {
                        let _ = writeln!(out, "  [{}] {}", source, d.message);
                    }
                    None => {
                        let _ = writeln!(out, "  {}", d.message);
                    }
                }
            }
        }

        out
    }
}
