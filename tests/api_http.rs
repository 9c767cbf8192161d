// tests/api_http.rs
//
// HTTP-level tests for the API router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET  /api/health
// - POST /api/analyze (success, missing topic, blank topic, malformed body,
//   out-of-range timeout)

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use std::sync::Arc;
use tower::ServiceExt as _; // for `oneshot`

use ariel::chunking::Chunker;
use ariel::cli::commands::{router, ApiStatus, AppState};
use ariel::config::ChunkingMode;
use ariel::orchestrator::{Orchestrator, PipelineConfig};
use ariel::provider::fake::{FakeReasoningProvider, StaticResearchProvider};
use ariel::source::{ResearchAdapter, ResearchResponse};

const BODY_LIMIT: usize = 1024 * 1024;

/// Router wired to fake providers only.
fn test_router() -> Router {
    let research = StaticResearchProvider::new(ResearchResponse {
        summary: "Fusion reactors confine plasma magnetically".to_string(),
        ..Default::default()
    });
    let adapter = ResearchAdapter::new(Arc::new(research), Chunker::new(ChunkingMode::Words, 50));

    let analyzer = FakeReasoningProvider::returning(json!({
        "summary": "Plasma confinement overview.",
        "key_points": ["Tokamaks use magnetic fields"],
        "topics": ["fusion"],
        "sentiment": {"positive": 1, "negative": 0, "neutral": 1},
        "technical_complexity": 6
    }));
    let synthesis = FakeReasoningProvider::returning(json!({
        "narrative": {"overall": "Fusion is progressing."},
        "consensus": [],
        "debate": [],
        "follow_up_questions": ["What limits confinement time?"]
    }));

    let orchestrator = Orchestrator::with_components(
        PipelineConfig::default(),
        vec![Arc::new(adapter)],
        Arc::new(analyzer),
        Arc::new(synthesis),
    );
    let state = Arc::new(AppState::new(
        orchestrator,
        ApiStatus {
            research: true,
            openai: false,
        },
    ));

    router(state, &["http://localhost:3000".to_string()])
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_analyze(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build POST /api/analyze")
}

#[tokio::test]
async fn api_health_reports_configured_apis() {
    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .expect("build GET /api/health");

    let resp = test_router().oneshot(req).await.expect("oneshot /api/health");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["status"], "healthy");
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(v["apis"]["research"], true);
    assert_eq!(v["apis"]["openai"], false);
}

#[tokio::test]
async fn api_analyze_returns_report() {
    let payload = json!({ "topic": "nuclear fusion", "options": { "timeout_seconds": 30 } });

    let resp = test_router()
        .oneshot(post_analyze(payload.to_string()))
        .await
        .expect("oneshot /api/analyze");
    assert_eq!(resp.status(), StatusCode::OK);

    let v = read_json(resp).await;
    assert_eq!(v["topic"], "nuclear fusion");
    assert!(v.get("id").is_some(), "missing 'id'");
    assert_eq!(v["sources"][0]["source"], "research");
    assert_eq!(v["sources"][0]["status"]["kind"], "genuine");
    assert_eq!(
        v["sources"][0]["result"]["key_points"][0],
        "Tokamaks use magnetic fields"
    );
    assert_eq!(v["narrative"]["overall"], "Fusion is progressing.");
    assert_eq!(v["follow_up_questions"][0], "What limits confinement time?");
}

#[tokio::test]
async fn api_analyze_without_topic_is_400() {
    let resp = test_router()
        .oneshot(post_analyze(json!({}).to_string()))
        .await
        .expect("oneshot /api/analyze");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let v = read_json(resp).await;
    assert_eq!(v["error"], "No topic provided");
}

#[tokio::test]
async fn api_analyze_blank_topic_is_400() {
    let resp = test_router()
        .oneshot(post_analyze(json!({ "topic": "   " }).to_string()))
        .await
        .expect("oneshot /api/analyze");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_analyze_malformed_body_is_400() {
    let resp = test_router()
        .oneshot(post_analyze("{ not json".to_string()))
        .await
        .expect("oneshot /api/analyze");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let v = read_json(resp).await;
    assert!(v.get("error").is_some(), "missing 'error'");
}

#[tokio::test]
async fn api_analyze_out_of_range_timeout_is_400() {
    for timeout_seconds in [0u64, u64::MAX] {
        let payload = json!({ "topic": "nuclear fusion", "options": { "timeout_seconds": timeout_seconds } });
        let resp = test_router()
            .oneshot(post_analyze(payload.to_string()))
            .await
            .expect("oneshot /api/analyze");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "timeout_seconds = {}", timeout_seconds);

        let v = read_json(resp).await;
        assert!(v["error"].as_str().unwrap_or("").contains("timeout_seconds"));
    }
}
