use crate::envelope::ResponseEnvelope;
use crate::errors::PipelineError;
use crate::pipeline::RequestHandler;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use kbqa_core::{EmbeddingClient, GeneratedAnswer, ServiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

/// Application state shared with all routes
#[derive(Clone)]
pub struct AppState {
    handler: Arc<RequestHandler>,
    embedder: Arc<dyn EmbeddingClient>,
}

impl AppState {
    pub fn new(handler: Arc<RequestHandler>, embedder: Arc<dyn EmbeddingClient>) -> Self {
        Self { handler, embedder }
    }
}

#[derive(Deserialize)]
pub struct EmbedRequest {
    text: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct EmbedResponse {
    pub embedding: Vec<f32>,
}

#[derive(Deserialize)]
pub struct RetrieveAndGenerateRequest {
    input: String,
    #[serde(default)]
    result_count: Option<usize>,
}

/// Error type for the auxiliary routes
#[derive(Debug)]
pub enum ApiError {
    Upstream(ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Upstream(e) => {
                error!(error = %e, "Upstream service call failed");
                let status = match &e {
                    ServiceError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                let body = Json(serde_json::json!({ "error": e.to_string() }));
                (status, body).into_response()
            }
        }
    }
}

/// Build the router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(health))
        .route("/invoke", post(handle_invoke))
        .route("/embed", post(handle_embed))
        .route("/retrieve-and-generate", post(handle_retrieve_and_generate))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server failed: {}", e))
}

/// Health check handler
async fn health() -> impl IntoResponse {
    "kbqa is running"
}

/// Runs one pipeline invocation. The HTTP status mirrors the envelope's `statusCode`.
/// A body that is not JSON, whatever its content type, also gets the failure envelope.
async fn handle_invoke(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<ResponseEnvelope>) {
    let envelope = match serde_json::from_slice::<Value>(&body) {
        Ok(event) => state.handler.handle(&event).await,
        Err(e) => {
            let err = PipelineError::Validation(format!("event is not valid JSON: {}", e));
            warn!(kind = err.kind(), error = %err, "Rejected invocation");
            ResponseEnvelope::failure(&err)
        }
    };
    let status =
        StatusCode::from_u16(envelope.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope))
}

async fn handle_embed(
    State(state): State<AppState>,
    Json(payload): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let embedding = state
        .embedder
        .embed(&payload.text)
        .await
        .map_err(ApiError::Upstream)?;
    Ok(Json(EmbedResponse { embedding }))
}

async fn handle_retrieve_and_generate(
    State(state): State<AppState>,
    Json(payload): Json<RetrieveAndGenerateRequest>,
) -> Result<Json<GeneratedAnswer>, ApiError> {
    let result_count = payload
        .result_count
        .unwrap_or_else(|| state.handler.result_count());
    let answer = state
        .handler
        .knowledge_base()
        .retrieve_and_generate(&payload.input, result_count)
        .await
        .map_err(ApiError::Upstream)?;
    Ok(Json(answer))
}
