//! Segment analysis, per-source aggregation and cross-source synthesis.
//!
//! Data flows segment text → [`SegmentJudgment`] (analyzer) →
//! [`AggregatedResult`] (aggregator, one per source) → [`crate::report::Report`]
//! (synthesizer).

mod aggregator;
mod analyzer;
mod synthesizer;

pub use aggregator::{AggregatedResult, Aggregator, RelevancePolicy};
pub use analyzer::{judgment_from_payload, segment_judgment_schema, SegmentAnalyzer};
pub use synthesizer::{synthesis_schema, Synthesis, Synthesizer};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default complexity when nothing better is known.
pub const NEUTRAL_COMPLEXITY: f64 = 0.5;

/// Sentiment distribution over positive, negative and neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl Sentiment {
    /// Uniform distribution (1/3 each).
    pub fn uniform() -> Self {
        Self {
            positive: 1.0 / 3.0,
            negative: 1.0 / 3.0,
            neutral: 1.0 / 3.0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.positive + self.negative + self.neutral
    }

    /// Rescale so the components sum to 1.0.
    ///
    /// Negative or non-finite components count as zero; an all-zero
    /// distribution becomes uniform.
    pub fn normalized(self) -> Self {
        let clean = |v: f64| if v.is_finite() && v > 0.0 { v } else { 0.0 };
        let positive = clean(self.positive);
        let negative = clean(self.negative);
        let neutral = clean(self.neutral);

        let sum = positive + negative + neutral;
        if sum <= 0.0 || !sum.is_finite() {
            return Self::uniform();
        }

        Self {
            positive: positive / sum,
            negative: negative / sum,
            neutral: neutral / sum,
        }
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Rescale a raw complexity score into [0, 1].
///
/// Providers may answer on a 0-10 scale: any value above 1 is divided by
/// ten before clamping. Non-finite values become the neutral 0.5.
pub fn normalize_complexity(raw: f64) -> f64 {
    if !raw.is_finite() {
        return NEUTRAL_COMPLEXITY;
    }
    let scaled = if raw > 1.0 { raw / 10.0 } else { raw };
    scaled.clamp(0.0, 1.0)
}

/// Structured judgment of one text segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentJudgment {
    pub summary: String,
    pub key_points: Vec<String>,
    pub topics: BTreeSet<String>,
    pub sentiment: Sentiment,
    /// Technical complexity in [0, 1].
    pub technical_complexity: f64,
    /// Speaker label → role description.
    pub speakers: BTreeMap<String, String>,
    /// True when this is the low-confidence default substituted for a failed analysis.
    #[serde(default)]
    pub fallback: bool,
}

impl SegmentJudgment {
    /// Low-confidence default used when a segment cannot be analyzed.
    pub fn fallback() -> Self {
        Self {
            summary: String::new(),
            key_points: Vec::new(),
            topics: BTreeSet::new(),
            sentiment: Sentiment::uniform(),
            technical_complexity: NEUTRAL_COMPLEXITY,
            speakers: BTreeMap::new(),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_complexity() {
        assert_eq!(normalize_complexity(12.0), 1.0);
        assert_eq!(normalize_complexity(0.5), 0.5);
        assert_eq!(normalize_complexity(-1.0), 0.0);
        assert_eq!(normalize_complexity(7.0), 0.7);
        assert_eq!(normalize_complexity(1.0), 1.0);
        assert_eq!(normalize_complexity(f64::NAN), 0.5);
    }

    #[test]
    fn test_sentiment_normalization() {
        let s = Sentiment {
            positive: 2.0,
            negative: 1.0,
            neutral: 1.0,
        }
        .normalized();
        assert!((s.sum() - 1.0).abs() < 1e-9);
        assert!((s.positive - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sentiment_becomes_uniform() {
        let s = Sentiment {
            positive: 0.0,
            negative: -3.0,
            neutral: f64::NAN,
        }
        .normalized();
        assert_eq!(s, Sentiment::uniform());
    }

    #[test]
    fn test_fallback_judgment() {
        let j = SegmentJudgment::fallback();
        assert!(j.fallback);
        assert!(j.summary.is_empty());
        assert_eq!(j.sentiment, Sentiment::uniform());
        assert_eq!(j.technical_complexity, 0.5);
    }
}
