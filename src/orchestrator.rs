//! Pipeline orchestrator for Ariel.
//!
//! Drives one topic through every stage: concurrent fan-out to the source
//! adapters, bounded per-segment analysis, per-source aggregation and the
//! final cross-source synthesis. Source and segment failures degrade to
//! neutral defaults; only an invalid topic fails a run.

use crate::analysis::{Aggregator, RelevancePolicy, SegmentAnalyzer, SegmentJudgment, Synthesizer};
use crate::chunking::Chunker;
use crate::config::{PipelineSettings, Prompts, Settings, MAX_TIMEOUT_SECONDS};
use crate::error::Result;
use crate::provider::{OpenAIReasoningProvider, ReasoningProvider};
use crate::report::{Diagnostic, Report, SourceReport, SourceStatus};
use crate::source::{
    validate_topic, PerplexityResearchProvider, ResearchAdapter, SourceAdapter, SourceKind,
    SourceResult, VideoAdapter, YtDlpVideoProvider,
};
use futures::future::BoxFuture;
use futures::stream::{self, FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

/// Longest deadline a run accepts; larger requests are clamped to it.
pub const MAX_RUN_TIMEOUT: Duration = Duration::from_secs(MAX_TIMEOUT_SECONDS);

/// Tunables for one orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Deadline for fetching and analyzing every source.
    pub timeout: Duration,
    /// Budget for the synthesis call once aggregation is done.
    pub synthesis_timeout: Duration,
    /// Maximum segment analysis calls in flight per source.
    pub max_concurrent_segments: usize,
    pub relevance: RelevancePolicy,
    pub max_follow_up_questions: usize,
}

impl PipelineConfig {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_seconds),
            synthesis_timeout: Duration::from_secs(settings.synthesis_timeout_seconds),
            max_concurrent_segments: settings.max_concurrent_segments.max(1),
            relevance: RelevancePolicy::from_settings(settings),
            max_follow_up_questions: settings.max_follow_up_questions,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&PipelineSettings::default())
    }
}

/// Stage of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    FetchingSources,
    AnalyzingSegments,
    Aggregating,
    Synthesizing,
    Done,
    Failed(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    /// Whether `next` may follow this state.
    pub fn can_transition_to(&self, next: &PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, FetchingSources)
            | (FetchingSources, AnalyzingSegments)
            | (AnalyzingSegments, Aggregating)
            | (Aggregating, Synthesizing)
            | (Synthesizing, Done) => true,
            (current, Failed(_)) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::FetchingSources => write!(f, "fetching sources"),
            PipelineState::AnalyzingSegments => write!(f, "analyzing segments"),
            PipelineState::Aggregating => write!(f, "aggregating"),
            PipelineState::Synthesizing => write!(f, "synthesizing"),
            PipelineState::Done => write!(f, "done"),
            PipelineState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Terminal state of a run together with every state it passed through.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: PipelineState,
    /// States in order, starting with `Idle`.
    pub history: Vec<PipelineState>,
    /// Present exactly when `state` is `Done`.
    pub report: Option<Report>,
}

struct StateTracker {
    history: Vec<PipelineState>,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            history: vec![PipelineState::Idle],
        }
    }

    fn current(&self) -> &PipelineState {
        // history always holds at least Idle
        &self.history[self.history.len() - 1]
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.current().can_transition_to(&next),
            "invalid transition {} -> {}",
            self.current(),
            next
        );
        info!("Pipeline: {}", next);
        self.history.push(next);
    }
}

/// Outcome of fetching one source before analysis.
enum Fetched {
    Ok(SourceResult),
    Failed(SourceKind, String),
}

impl Fetched {
    fn kind(&self) -> SourceKind {
        match self {
            Fetched::Ok(result) => result.source,
            Fetched::Failed(kind, _) => *kind,
        }
    }
}

/// Deadline `timeout` from now, clamped to [`MAX_RUN_TIMEOUT`].
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(MAX_RUN_TIMEOUT)).unwrap_or(now)
}

/// The main orchestrator for the Ariel pipeline.
pub struct Orchestrator {
    config: PipelineConfig,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    analyzer: Arc<SegmentAnalyzer>,
    synthesizer: Synthesizer,
}

impl Orchestrator {
    /// Create an orchestrator wired to the live providers enabled in `settings`.
    pub fn new(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let credentials = settings.credentials();

        let reasoning: Arc<dyn ReasoningProvider> = Arc::new(OpenAIReasoningProvider::new(
            &settings.reasoning,
            &credentials,
        )?);

        let chunker = Chunker::new(settings.pipeline.chunking, settings.pipeline.segment_max_words);
        let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();

        if settings.research.enabled {
            let provider = PerplexityResearchProvider::new(
                &settings.research,
                &credentials,
                prompts.clone(),
                Duration::from_secs(settings.reasoning.request_timeout_seconds),
            )?;
            adapters.push(Arc::new(ResearchAdapter::new(Arc::new(provider), chunker.clone())));
        }

        if settings.video.enabled {
            let temp_dir = settings.temp_dir();
            std::fs::create_dir_all(&temp_dir)?;
            let provider = YtDlpVideoProvider::new(&settings.video, temp_dir);
            adapters.push(Arc::new(VideoAdapter::new(Arc::new(provider), chunker)));
        }

        if adapters.is_empty() {
            warn!("All sources are disabled; reports will be empty");
        }

        Ok(Self::with_components(
            PipelineConfig::from_settings(&settings.pipeline),
            adapters,
            reasoning.clone(),
            reasoning,
        )
        .with_prompts(prompts))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        config: PipelineConfig,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        analysis_provider: Arc<dyn ReasoningProvider>,
        synthesis_provider: Arc<dyn ReasoningProvider>,
    ) -> Self {
        let synthesizer = Synthesizer::new(synthesis_provider, config.max_follow_up_questions);
        Self {
            analyzer: Arc::new(SegmentAnalyzer::new(analysis_provider)),
            synthesizer,
            adapters,
            config,
        }
    }

    /// Use custom prompt templates for analysis and synthesis.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.analyzer = Arc::new(SegmentAnalyzer::clone(&self.analyzer).with_prompts(prompts.clone()));
        self.synthesizer = self.synthesizer.with_prompts(prompts);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Source kinds this orchestrator fans out to.
    pub fn sources(&self) -> Vec<SourceKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }

    /// Produce a report for `topic` within the configured timeouts.
    ///
    /// Fails only for an empty topic.
    pub async fn run(&self, topic: &str) -> Result<Report> {
        self.run_with_timeout(topic, self.config.timeout).await
    }

    /// Like [`Orchestrator::run`] with an explicit fetch and analysis deadline.
    ///
    /// Timeouts above [`MAX_RUN_TIMEOUT`] are clamped.
    pub async fn run_with_timeout(&self, topic: &str, timeout: Duration) -> Result<Report> {
        let mut tracker = StateTracker::new();
        self.execute(topic, timeout, &mut tracker).await
    }

    /// Run and return the state history alongside the report.
    pub async fn run_traced(&self, topic: &str) -> RunOutcome {
        let mut tracker = StateTracker::new();
        match self.execute(topic, self.config.timeout, &mut tracker).await {
            Ok(report) => RunOutcome {
                state: tracker.current().clone(),
                history: tracker.history,
                report: Some(report),
            },
            Err(e) => {
                tracker.advance(PipelineState::Failed(e.to_string()));
                RunOutcome {
                    state: tracker.current().clone(),
                    history: tracker.history,
                    report: None,
                }
            }
        }
    }

    #[instrument(skip(self, tracker), fields(sources = self.adapters.len()))]
    async fn execute(
        &self,
        topic: &str,
        timeout: Duration,
        tracker: &mut StateTracker,
    ) -> Result<Report> {
        let topic: Arc<str> = Arc::from(validate_topic(topic)?);
        let timeout = timeout.min(MAX_RUN_TIMEOUT);
        let deadline = deadline_after(timeout);

        tracker.advance(PipelineState::FetchingSources);

        let mut fetches: FuturesUnordered<BoxFuture<'static, (usize, Fetched)>> =
            FuturesUnordered::new();
        for (idx, adapter) in self.adapters.iter().enumerate() {
            let fetch = fetch_source(Arc::clone(adapter), Arc::clone(&topic), deadline, timeout);
            fetches.push(async move { (idx, fetch.await) }.boxed());
        }
        let mut analyses: FuturesUnordered<
            BoxFuture<'static, (usize, Fetched, Vec<SegmentJudgment>)>,
        > = FuturesUnordered::new();
        let mut finished: Vec<Option<(Fetched, Vec<SegmentJudgment>)>> =
            self.adapters.iter().map(|_| None).collect();

        // A source's segments are analyzed as soon as that source is fetched,
        // so a slow source never holds back the others.
        loop {
            tokio::select! {
                Some((idx, fetched)) = fetches.next(), if !fetches.is_empty() => {
                    if *tracker.current() == PipelineState::FetchingSources {
                        tracker.advance(PipelineState::AnalyzingSegments);
                    }
                    let analysis = analyze_source(
                        Arc::clone(&self.analyzer),
                        Arc::clone(&topic),
                        fetched,
                        deadline,
                        self.config.max_concurrent_segments,
                    );
                    analyses.push(
                        async move {
                            let (fetched, judgments) = analysis.await;
                            (idx, fetched, judgments)
                        }
                        .boxed(),
                    );
                }
                Some((idx, fetched, judgments)) = analyses.next(), if !analyses.is_empty() => {
                    finished[idx] = Some((fetched, judgments));
                }
                else => break,
            }
        }

        if *tracker.current() == PipelineState::FetchingSources {
            tracker.advance(PipelineState::AnalyzingSegments);
        }

        tracker.advance(PipelineState::Aggregating);
        let aggregator = Aggregator::new(&*topic, self.config.relevance);
        let mut diagnostics = Vec::new();
        let sources: Vec<SourceReport> = finished
            .into_iter()
            .flatten()
            .map(|(fetched, judgments)| {
                let (report, diagnostic) = build_source_report(&aggregator, fetched, judgments);
                diagnostics.extend(diagnostic);
                report
            })
            .collect();

        // Synthesis gets its own budget so sources cut off at the deadline
        // do not starve it.
        tracker.advance(PipelineState::Synthesizing);
        let synthesis_timeout = self.config.synthesis_timeout.min(MAX_RUN_TIMEOUT);
        let fallback_sources = sources.clone();
        let synthesis = self.synthesizer.synthesize(&topic, sources);
        let mut report = match tokio::time::timeout(synthesis_timeout, synthesis).await {
            Ok(report) => report,
            Err(_) => {
                warn!("Synthesis timed out");
                let mut report = Report::new(&*topic, fallback_sources);
                report.diagnostics.push(Diagnostic::warning(
                    None,
                    format!("Synthesis timed out after {}s", synthesis_timeout.as_secs_f64()),
                ));
                report
            }
        };

        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;

        tracker.advance(PipelineState::Done);
        Ok(report)
    }
}

/// Fetch one source, bounded by the run deadline.
async fn fetch_source(
    adapter: Arc<dyn SourceAdapter>,
    topic: Arc<str>,
    deadline: Instant,
    timeout: Duration,
) -> Fetched {
    let kind = adapter.kind();
    match timeout_at(deadline, adapter.fetch(&topic)).await {
        Ok(Ok(result)) => {
            info!("Source {} returned {} segments", kind, result.segments.len());
            Fetched::Ok(result)
        }
        Ok(Err(e)) => {
            warn!("Source {} failed: {}", kind, e);
            Fetched::Failed(kind, e.to_string())
        }
        Err(_) => {
            warn!("Source {} timed out", kind);
            Fetched::Failed(kind, format!("timed out after {}s", timeout.as_secs_f64()))
        }
    }
}

/// Analyze the segments of one fetched source, at most `limit` at a time.
///
/// Judgments come back in original segment order.
async fn analyze_source(
    analyzer: Arc<SegmentAnalyzer>,
    topic: Arc<str>,
    fetched: Fetched,
    deadline: Instant,
    limit: usize,
) -> (Fetched, Vec<SegmentJudgment>) {
    let segments = match &fetched {
        Fetched::Ok(result) => result.segments.clone(),
        Fetched::Failed(..) => return (fetched, Vec::new()),
    };
    let kind = fetched.kind();

    debug!("Analyzing {} {} segments, {} at a time", segments.len(), kind, limit);

    let mut results: Vec<(usize, SegmentJudgment)> = stream::iter(segments.into_iter().enumerate())
        .map(move |(idx, text)| {
            let analyzer = Arc::clone(&analyzer);
            let topic = Arc::clone(&topic);
            async move {
                let judgment = match timeout_at(deadline, analyzer.analyze(&text, &topic)).await {
                    Ok(judgment) => judgment,
                    Err(_) => {
                        warn!("Segment {} of {} timed out", idx, kind);
                        SegmentJudgment::fallback()
                    }
                };
                (idx, judgment)
            }
        })
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    // Restore original segment order
    results.sort_by_key(|(idx, _)| *idx);
    (fetched, results.into_iter().map(|(_, judgment)| judgment).collect())
}

/// Aggregate one source and decide whether it counts as genuine.
fn build_source_report(
    aggregator: &Aggregator,
    fetched: Fetched,
    judgments: Vec<SegmentJudgment>,
) -> (SourceReport, Option<Diagnostic>) {
    let result = match fetched {
        Fetched::Ok(result) => result,
        Fetched::Failed(kind, reason) => {
            let diagnostic = Diagnostic::warning(Some(kind), format!("Source failed: {}", reason));
            return (SourceReport::fallback(kind, reason), Some(diagnostic));
        }
    };

    let kind = result.source;
    let analyzed = judgments.len();
    let degraded = judgments.iter().filter(|j| j.fallback).count();

    let (status, aggregated, diagnostic) = if analyzed == 0 {
        (
            SourceStatus::Fallback {
                reason: "source returned no content".to_string(),
            },
            aggregator.aggregate(&[]),
            Some(Diagnostic::info(Some(kind), "Source returned no content")),
        )
    } else if degraded == analyzed {
        (
            SourceStatus::Fallback {
                reason: format!("all {} segments failed analysis", analyzed),
            },
            aggregator.aggregate(&[]),
            Some(Diagnostic::warning(
                Some(kind),
                format!("All {} segments failed analysis", analyzed),
            )),
        )
    } else {
        let diagnostic = (degraded > 0).then(|| {
            Diagnostic::warning(
                Some(kind),
                format!("{} of {} segments fell back to a default judgment", degraded, analyzed),
            )
        });
        (SourceStatus::Genuine, aggregator.aggregate(&judgments), diagnostic)
    };

    let report = SourceReport {
        source: kind,
        status,
        metadata: result.metadata,
        segments_analyzed: analyzed,
        segments_degraded: degraded,
        result: aggregated,
    };
    (report, diagnostic)
}
