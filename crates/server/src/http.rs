//! HTTP Endpoints
//!
//! REST API for the Q&A engine.

use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use docqa_core::Query;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::ServerError;

/// Deadline for the health, readiness and metrics endpoints
const OPS_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the application router
///
/// `/api/ask` carries no tower timeout: its deadline cancels the query so the
/// caller still receives the structured failure.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);

    let ops = Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(OPS_TIMEOUT));

    Router::new()
        .route("/api/ask", post(ask))
        .merge(ops)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let parsed_origins = if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        parsed_origins
    };

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Ask request
#[derive(Debug, Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default)]
    request_id: Option<String>,
}

/// `POST /api/ask`
///
/// 200 with the answer record, 503 with the structured failure. Reaching
/// `server.request_timeout_seconds` cancels the query, which then fails as
/// `cancelled`. If the client disconnects, the handler future is dropped and
/// the drop guard cancels the query.
async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Response, ServerError> {
    let query = Query::new(request.question.trim());
    if query.is_blank() {
        return Err(ServerError::InvalidRequest("question must not be empty".to_string()));
    }
    let query = match request.request_id.filter(|id| !id.trim().is_empty()) {
        Some(id) => query.with_request_id(id),
        None => Query::with_generated_id(query.text()),
    };

    let deadline = Duration::from_secs(state.config.server.request_timeout_seconds);
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let answer = state.orchestrator.ask_query(&query, &cancel);
    tokio::pin!(answer);
    let result = tokio::select! {
        result = &mut answer => result,
        _ = tokio::time::sleep(deadline) => {
            tracing::warn!(
                request_id = query.request_id().unwrap_or("-"),
                timeout_secs = deadline.as_secs(),
                "Request deadline reached, cancelling query"
            );
            cancel.cancel();
            answer.await
        }
    };

    match result {
        Ok(record) => Ok((StatusCode::OK, Json(record)).into_response()),
        Err(failure) => Ok((StatusCode::SERVICE_UNAVAILABLE, Json(failure)).into_response()),
    }
}

/// Liveness
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: the generator must answer; a missing knowledge base only degrades
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let orchestrator = &state.orchestrator;

    let generator_ok = tokio::time::timeout(
        Duration::from_secs(2),
        orchestrator.generator().is_available(),
    )
    .await
    .unwrap_or(false);
    let knowledge_ok = orchestrator.retriever().is_ready();

    let status = if generator_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "ready": generator_ok,
            "checks": {
                "generator": {
                    "status": if generator_ok { "ok" } else { "unavailable" },
                    "model": orchestrator.generator().model_name(),
                },
                "knowledge_base": {
                    "status": if knowledge_ok { "ok" } else { "degraded" },
                    "retriever": orchestrator.retriever().name(),
                },
                "web_providers": orchestrator.web_providers(),
            }
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use docqa_agent::{Orchestrator, OrchestratorConfig};
    use docqa_config::Settings;
    use docqa_core::{
        GenerateRequest, GenerationError, Generator, ProviderError, RetrievalCandidate,
        RetrievalError, Retriever, WebProvider, WebSnippet,
    };
    use docqa_rag::{AnswerQualityValidator, ConfidenceAssessor};
    use docqa_web::WebFallbackChain;

    struct FixedRetriever(f32);

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn retrieve(
            &self,
            _q: &str,
            _k: usize,
        ) -> Result<Vec<RetrievalCandidate>, RetrievalError> {
            Ok(vec![
                RetrievalCandidate::new("Two year warranty.", self.0, "manual.pdf").with_page(12),
                RetrievalCandidate::new("Warranty claims.", self.0 - 0.01, "manual.pdf")
                    .with_page(13),
            ])
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, GenerationError> {
            Ok("The warranty lasts two years.".to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    /// Answers correctly, but only after a delay
    struct SlowGenerator(Duration);

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, GenerationError> {
            tokio::time::sleep(self.0).await;
            Ok("The warranty lasts two years.".to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }
    }

    struct DeadProvider;

    #[async_trait]
    impl WebProvider for DeadProvider {
        async fn search(&self, _q: &str, _n: usize) -> Result<Vec<WebSnippet>, ProviderError> {
            Err(ProviderError::Transport("offline".to_string()))
        }

        fn name(&self) -> &str {
            "dead"
        }
    }

    fn app(score: f32) -> Router {
        app_with(Settings::default(), score, Arc::new(EchoGenerator))
    }

    fn app_with(settings: Settings, score: f32, generator: Arc<dyn Generator>) -> Router {
        let chain = WebFallbackChain::new(
            vec![(Arc::new(DeadProvider) as Arc<dyn WebProvider>, Duration::from_millis(50))],
            5,
        )
        .unwrap();
        let orchestrator = Orchestrator::new(
            OrchestratorConfig::from_settings(&settings),
            Arc::new(FixedRetriever(score)),
            generator,
            chain,
            ConfidenceAssessor::from_settings(&settings),
            AnswerQualityValidator::from_settings(&settings).unwrap(),
        );
        create_router(AppState::new(settings, orchestrator))
    }

    fn ask_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/ask")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ask_answers_from_knowledge_base() {
        let response = app(0.9)
            .oneshot(ask_request(serde_json::json!({
                "question": "How long is the warranty?",
                "request_id": "req-42"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["source_type"], "knowledge_base");
        assert_eq!(body["request_id"], "req-42");
        assert_eq!(body["citations"][0]["label"], "Page 12");
        assert!(body.get("notice").is_none());
    }

    #[tokio::test]
    async fn test_ask_failure_is_structured() {
        let response = app(0.1)
            .oneshot(ask_request(serde_json::json!({ "question": "Who won in 1998?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "fallback_exhausted");
        assert_eq!(body["failures"].as_array().unwrap().last().unwrap()["component"], "dead");
        assert!(body["notice"].is_string());
        assert!(body["request_id"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_answer_within_deadline_succeeds() {
        let generator = Arc::new(SlowGenerator(Duration::from_millis(1_500)));
        let response = app_with(Settings::default(), 0.9, generator)
            .oneshot(ask_request(serde_json::json!({ "question": "How long is the warranty?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["source_type"], "knowledge_base");
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_deadline_yields_structured_failure() {
        let mut settings = Settings::default();
        settings.server.request_timeout_seconds = 1;
        let generator = Arc::new(SlowGenerator(Duration::from_millis(1_500)));

        let response = app_with(settings, 0.9, generator)
            .oneshot(ask_request(serde_json::json!({ "question": "How long is the warranty?" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "cancelled");
        assert_eq!(body["path"].as_array().unwrap().last().unwrap(), "failed");
        assert_eq!(body["failures"][0]["component"], "slow");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_question_rejected() {
        let response = app(0.9)
            .oneshot(ask_request(serde_json::json!({ "question": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let response = app(0.9)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(0.9)
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["checks"]["web_providers"][0], "dead");
    }

    #[tokio::test]
    async fn test_metrics_disabled_without_recorder() {
        let response = app(0.9)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
