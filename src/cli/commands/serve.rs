//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for topic analysis and health checks.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Credentials, Settings, MAX_TIMEOUT_SECONDS};
use crate::error::ArielError;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

/// Which upstream APIs have credentials configured.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ApiStatus {
    pub research: bool,
    pub openai: bool,
}

impl From<&Credentials> for ApiStatus {
    fn from(credentials: &Credentials) -> Self {
        Self {
            research: credentials.research_api_key.is_some(),
            openai: credentials.openai_api_key.is_some(),
        }
    }
}

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
    apis: ApiStatus,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, apis: ApiStatus) -> Self {
        Self { orchestrator, apis }
    }
}

/// Build the API router.
///
/// An empty `cors_origins` list allows any origin.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::warning(&format!("{}", e));
        Output::info("Requests will return degraded reports until this is fixed.");
    }

    let orchestrator = Orchestrator::new(&settings)?;
    let apis = ApiStatus::from(&settings.credentials());
    let state = Arc::new(AppState::new(orchestrator, apis));

    let app = router(state, &settings.server.cors_origins);

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Ariel API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /api/health");
    Output::kv("Analyze", "POST /api/analyze");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    options: Option<AnalyzeRequestOptions>,
}

#[derive(Deserialize, Default)]
struct AnalyzeRequestOptions {
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    apis: ApiStatus,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        apis: state.apis,
    })
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> impl IntoResponse {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let topic = match req.topic.as_deref().map(str::trim) {
        Some(topic) if !topic.is_empty() => topic.to_string(),
        _ => return error_response(StatusCode::BAD_REQUEST, "No topic provided"),
    };

    let timeout = match req.options.unwrap_or_default().timeout_seconds {
        None => state.orchestrator.config().timeout,
        Some(secs) if (1..=MAX_TIMEOUT_SECONDS).contains(&secs) => Duration::from_secs(secs),
        Some(_) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("timeout_seconds must be between 1 and {}", MAX_TIMEOUT_SECONDS),
            );
        }
    };

    info!("Analyzing topic via API: {}", topic);

    match state.orchestrator.run_with_timeout(&topic, timeout).await {
        Ok(report) => Json(report).into_response(),
        Err(ArielError::InvalidInput(msg)) => error_response(StatusCode::BAD_REQUEST, msg),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_from_credentials() {
        let status = ApiStatus::from(&Credentials {
            openai_api_key: Some("sk-test".to_string()),
            research_api_key: None,
        });
        assert!(status.openai);
        assert!(!status.research);
    }
}
