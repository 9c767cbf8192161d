// tests/pipeline.rs
//
// End-to-end runs of the Orchestrator against deterministic fake providers.
// No network, no external tools.

use ariel::analysis::AggregatedResult;
use ariel::config::ChunkingMode;
use ariel::chunking::Chunker;
use ariel::error::{ArielError, ProviderError};
use ariel::orchestrator::{Orchestrator, PipelineConfig, PipelineState};
use ariel::provider::fake::{FakeReasoningProvider, StaticResearchProvider, StaticVideoProvider};
use ariel::provider::CompletionRequest;
use ariel::report::SourceStatus;
use ariel::source::{
    ResearchAdapter, ResearchResponse, SourceAdapter, SourceKind, VideoAdapter, VideoItem,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_test::{assert_err, assert_ok};

/// The analysis prompt ends with the segment text on its own line.
fn segment_of(request: &CompletionRequest) -> String {
    request.user.rsplit('\n').next().unwrap_or("").to_string()
}

fn echo_analyzer() -> FakeReasoningProvider {
    FakeReasoningProvider::new(|request| {
        let segment = segment_of(request);
        Ok(json!({
            "summary": segment,
            "key_points": [segment],
            "topics": ["quantum"],
            "sentiment": {"positive": 2, "negative": 0, "neutral": 2},
            "technical_complexity": 7
        }))
    })
}

fn research_adapter(provider: StaticResearchProvider) -> Arc<dyn SourceAdapter> {
    Arc::new(ResearchAdapter::new(Arc::new(provider), Chunker::new(ChunkingMode::Words, 5)))
}

fn video_adapter(provider: StaticVideoProvider) -> Arc<dyn SourceAdapter> {
    Arc::new(VideoAdapter::new(Arc::new(provider), Chunker::new(ChunkingMode::Words, 5)))
}

/// Research answer that chunks into exactly two five-word segments.
fn two_segment_research() -> StaticResearchProvider {
    StaticResearchProvider::new(ResearchResponse {
        summary: "Qubits enable quantum parallelism today".to_string(),
        key_insights: vec!["Error correction remains the hurdle".to_string()],
        sources: vec!["Nature".to_string()],
        citations: vec![],
    })
}

fn synthesis_recorder(seen: Arc<Mutex<Vec<String>>>) -> FakeReasoningProvider {
    FakeReasoningProvider::new(move |request| {
        seen.lock().unwrap().push(request.user.clone());
        Ok(json!({
            "narrative": {"overall": "Quantum hardware is advancing; error correction is key."},
            "consensus": ["Qubits are fragile"],
            "debate": [],
            "follow_up_questions": ["When will logical qubits scale?"]
        }))
    })
}

#[tokio::test]
async fn quantum_computing_with_empty_video_source() {
    let synthesis_inputs = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![
            research_adapter(two_segment_research()),
            video_adapter(StaticVideoProvider::new(Vec::new())),
        ],
        Arc::new(echo_analyzer()),
        Arc::new(synthesis_recorder(synthesis_inputs.clone())),
    );

    let report = assert_ok!(orchestrator.run("quantum computing").await);

    assert_eq!(report.topic, "quantum computing");
    assert_eq!(report.sources.len(), 2);

    let research = report.source(SourceKind::Research).unwrap();
    assert_eq!(research.status, SourceStatus::Genuine);
    assert_eq!(research.segments_analyzed, 2);
    assert_eq!(research.segments_degraded, 0);
    assert_eq!(
        research.result.key_points,
        vec![
            "Qubits enable quantum parallelism today",
            "Error correction remains the hurdle"
        ]
    );
    assert_eq!(
        research.result.summary,
        "Qubits enable quantum parallelism today Error correction remains the hurdle"
    );
    assert!((research.result.sentiment.positive - 0.5).abs() < 1e-9);
    assert!((research.result.technical_complexity - 0.7).abs() < 1e-9);
    assert_eq!(research.result.relevance, 0.8);
    assert_eq!(research.metadata.get("source.0").map(String::as_str), Some("Nature"));

    let video = report.source(SourceKind::Video).unwrap();
    assert!(video.status.is_fallback());
    assert_eq!(video.result, AggregatedResult::baseline());

    assert!(!report.narrative.is_empty());
    assert_eq!(report.follow_up_questions, vec!["When will logical qubits scale?"]);

    let inputs = synthesis_inputs.lock().unwrap();
    assert_eq!(inputs.len(), 1);
    assert!(inputs[0].contains("## research findings"));
    assert!(!inputs[0].contains("## video findings"));
}

#[tokio::test]
async fn failing_source_is_isolated() {
    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![
            research_adapter(two_segment_research()),
            video_adapter(StaticVideoProvider::failing(ProviderError::Network(
                "connection refused".to_string(),
            ))),
        ],
        Arc::new(echo_analyzer()),
        Arc::new(FakeReasoningProvider::returning(json!({"narrative": "ok"}))),
    );

    let outcome = orchestrator.run_traced("quantum computing").await;
    assert_eq!(outcome.state, PipelineState::Done);

    let report = outcome.report.unwrap();
    let video = report.source(SourceKind::Video).unwrap();
    match &video.status {
        SourceStatus::Fallback { reason } => assert!(reason.contains("connection refused")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(video.result, AggregatedResult::baseline());
    assert_eq!(
        report.source(SourceKind::Research).unwrap().status,
        SourceStatus::Genuine
    );
    assert!(report.has_partial_data());
}

#[tokio::test]
async fn slow_source_is_cut_off_by_timeout() {
    let slow_video = StaticVideoProvider::new(vec![VideoItem {
        id: "abc".to_string(),
        transcript: "never analyzed".to_string(),
        ..Default::default()
    }])
    .with_delay(Duration::from_secs(10));

    let config = PipelineConfig {
        timeout: Duration::from_millis(300),
        ..PipelineConfig::default()
    };
    let synthesis = FakeReasoningProvider::returning(json!({"narrative": "ok"}))
        .with_delay(Duration::from_millis(20));
    let orchestrator = Orchestrator::with_components(
        config,
        vec![research_adapter(two_segment_research()), video_adapter(slow_video)],
        Arc::new(echo_analyzer()),
        Arc::new(synthesis),
    );

    let started = Instant::now();
    let report = assert_ok!(orchestrator.run("quantum computing").await);
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(2), "run took {:?}", elapsed);

    let video = report.source(SourceKind::Video).unwrap();
    match &video.status {
        SourceStatus::Fallback { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(video.result, AggregatedResult::baseline());

    // The cut-off source must not cost the others their synthesis
    assert_eq!(
        report.source(SourceKind::Research).unwrap().status,
        SourceStatus::Genuine
    );
    assert_eq!(report.narrative.get("overall").map(String::as_str), Some("ok"));
}

#[tokio::test]
async fn run_can_be_spawned_onto_the_runtime() {
    let orchestrator = Arc::new(Orchestrator::with_components(
        PipelineConfig::default(),
        vec![
            research_adapter(two_segment_research()),
            video_adapter(StaticVideoProvider::new(Vec::new())),
        ],
        Arc::new(echo_analyzer()),
        Arc::new(FakeReasoningProvider::returning(json!({"narrative": "ok"}))),
    ));

    let task = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run("quantum computing").await }
    });

    let report = assert_ok!(task.await.expect("analysis task panicked"));
    assert_eq!(report.sources.len(), 2);
}

#[tokio::test]
async fn oversized_timeout_does_not_panic() {
    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![research_adapter(two_segment_research())],
        Arc::new(echo_analyzer()),
        Arc::new(FakeReasoningProvider::returning(json!({"narrative": "ok"}))),
    );

    let report = assert_ok!(
        orchestrator
            .run_with_timeout("quantum computing", Duration::from_secs(u64::MAX))
            .await
    );
    assert_eq!(
        report.source(SourceKind::Research).unwrap().status,
        SourceStatus::Genuine
    );
}

#[tokio::test]
async fn blank_topic_is_rejected_without_fetching() {
    let research = Arc::new(FakeReasoningProvider::returning(json!({})));
    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![research_adapter(two_segment_research())],
        research.clone(),
        Arc::new(FakeReasoningProvider::returning(json!({}))),
    );

    let err = assert_err!(orchestrator.run("  \n ").await);
    assert!(matches!(err, ArielError::InvalidInput(_)));
    assert_eq!(research.calls(), 0);

    let outcome = orchestrator.run_traced("").await;
    assert!(matches!(outcome.state, PipelineState::Failed(_)));
    assert!(outcome.report.is_none());
}

#[tokio::test]
async fn every_source_failing_still_yields_a_report() {
    let synthesis = Arc::new(FakeReasoningProvider::returning(json!({"narrative": "unused"})));
    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![
            research_adapter(StaticResearchProvider::failing(ProviderError::Auth(
                "missing key".to_string(),
            ))),
            video_adapter(StaticVideoProvider::failing(ProviderError::Upstream(
                "yt-dlp not found".to_string(),
            ))),
        ],
        Arc::new(echo_analyzer()),
        synthesis.clone(),
    );

    let outcome = orchestrator.run_traced("quantum computing").await;
    assert_eq!(outcome.state, PipelineState::Done);

    let report = outcome.report.unwrap();
    assert!(report.sources.iter().all(|s| s.status.is_fallback()));
    assert!(report.sources.iter().all(|s| s.result == AggregatedResult::baseline()));
    assert!(report.narrative.is_empty());
    assert_eq!(synthesis.calls(), 0);
    assert!(!report.diagnostics.is_empty());
}

#[tokio::test]
async fn bad_segment_degrades_only_itself() {
    let analyzer = FakeReasoningProvider::new(|request| {
        let segment = segment_of(request);
        if segment.starts_with("Error") {
            return Err(ProviderError::MalformedResponse("not json".to_string()));
        }
        Ok(json!({
            "summary": segment,
            "key_points": [segment],
            "topics": ["quantum"],
            "sentiment": {"positive": 1, "negative": 0, "neutral": 0},
            "technical_complexity": 0.9
        }))
    });

    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![research_adapter(two_segment_research())],
        Arc::new(analyzer),
        Arc::new(FakeReasoningProvider::returning(json!({"narrative": "ok"}))),
    );

    let report = assert_ok!(orchestrator.run("quantum computing").await);
    let research = report.source(SourceKind::Research).unwrap();

    assert_eq!(research.status, SourceStatus::Genuine);
    assert_eq!(research.segments_analyzed, 2);
    assert_eq!(research.segments_degraded, 1);
    assert_eq!(research.result.key_points, vec!["Qubits enable quantum parallelism today"]);
    // Mean of 0.9 and the 0.5 default
    assert!((research.result.technical_complexity - 0.7).abs() < 1e-9);
    assert!((research.result.sentiment.sum() - 1.0).abs() < 1e-6);
    assert!(report.has_partial_data());
}
