//! Per-source aggregation of segment judgments.

use super::{SegmentJudgment, Sentiment, NEUTRAL_COMPLEXITY};
use crate::config::{PipelineSettings, RelevanceMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// One source's combined judgment across all of its segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub summary: String,
    /// Deduplicated key points, in order of first occurrence.
    pub key_points: Vec<String>,
    pub topics: BTreeSet<String>,
    pub sentiment: Sentiment,
    pub technical_complexity: f64,
    pub speakers: BTreeMap<String, String>,
    /// Relevance to the topic in [0, 1].
    pub relevance: f64,
}

impl AggregatedResult {
    /// Neutral result used for empty or failed sources.
    pub fn baseline() -> Self {
        Self {
            summary: String::new(),
            key_points: Vec::new(),
            topics: BTreeSet::new(),
            sentiment: Sentiment::uniform(),
            technical_complexity: NEUTRAL_COMPLEXITY,
            speakers: BTreeMap::new(),
            relevance: 0.0,
        }
    }

    /// True when there is any textual content to report.
    pub fn has_content(&self) -> bool {
        !self.summary.is_empty() || !self.key_points.is_empty() || !self.topics.is_empty()
    }
}

impl Default for AggregatedResult {
    fn default() -> Self {
        Self::baseline()
    }
}

/// How the relevance score of an aggregated result is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelevancePolicy {
    /// Fixed constant for any result with content, 0.0 otherwise.
    Placeholder(f64),
    /// Fraction of topic terms found in the summary, key points or topics.
    TermOverlap,
}

impl RelevancePolicy {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        match settings.relevance {
            RelevanceMode::Placeholder => Self::Placeholder(settings.placeholder_relevance),
            RelevanceMode::TermOverlap => Self::TermOverlap,
        }
    }

    /// Score `result` against `topic`. Pure and bounded to [0, 1].
    pub fn score(&self, topic: &str, result: &AggregatedResult) -> f64 {
        if !result.has_content() {
            return 0.0;
        }

        match self {
            RelevancePolicy::Placeholder(value) => {
                if value.is_finite() {
                    value.clamp(0.0, 1.0)
                } else {
                    0.0
                }
            }
            RelevancePolicy::TermOverlap => term_overlap(topic, result),
        }
    }
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self::Placeholder(0.8)
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

fn term_overlap(topic: &str, result: &AggregatedResult) -> f64 {
    let wanted = terms(topic);
    if wanted.is_empty() {
        return 0.0;
    }

    let mut haystack = terms(&result.summary);
    for point in &result.key_points {
        haystack.extend(terms(point));
    }
    for t in &result.topics {
        haystack.extend(terms(t));
    }

    let hits = wanted.iter().filter(|t| haystack.contains(*t)).count();
    hits as f64 / wanted.len() as f64
}

/// Combines the segment judgments of one source.
#[derive(Debug, Clone)]
pub struct Aggregator {
    topic: String,
    policy: RelevancePolicy,
}

impl Aggregator {
    pub fn new(topic: impl Into<String>, policy: RelevancePolicy) -> Self {
        Self {
            topic: topic.into(),
            policy,
        }
    }

    /// Aggregate judgments given in original segment order.
    ///
    /// An empty slice yields [`AggregatedResult::baseline`].
    pub fn aggregate(&self, judgments: &[SegmentJudgment]) -> AggregatedResult {
        if judgments.is_empty() {
            return AggregatedResult::baseline();
        }

        let count = judgments.len() as f64;

        let summary = judgments
            .iter()
            .map(|j| j.summary.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let mut seen = HashSet::new();
        let mut key_points = Vec::new();
        for point in judgments.iter().flat_map(|j| &j.key_points) {
            if seen.insert(point.as_str()) {
                key_points.push(point.clone());
            }
        }

        let topics = judgments
            .iter()
            .flat_map(|j| j.topics.iter().cloned())
            .collect();

        let sentiment = Sentiment {
            positive: judgments.iter().map(|j| j.sentiment.positive).sum::<f64>() / count,
            negative: judgments.iter().map(|j| j.sentiment.negative).sum::<f64>() / count,
            neutral: judgments.iter().map(|j| j.sentiment.neutral).sum::<f64>() / count,
        }
        .normalized();

        let technical_complexity =
            judgments.iter().map(|j| j.technical_complexity).sum::<f64>() / count;

        let mut speakers = BTreeMap::new();
        for judgment in judgments {
            for (label, role) in &judgment.speakers {
                speakers.insert(label.clone(), role.clone());
            }
        }

        let mut result = AggregatedResult {
            summary: summary.trim().to_string(),
            key_points,
            topics,
            sentiment,
            technical_complexity: technical_complexity.clamp(0.0, 1.0),
            speakers,
            relevance: 0.0,
        };
        result.relevance = self.policy.score(&self.topic, &result);
        result
    }
}
