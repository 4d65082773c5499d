use crate::types::{ChatRequestBody, ChatResponseBody};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use relay_host::ChatOrchestrator;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    /// One orchestrator instance; concurrent /chat requests are serialized
    /// because the relay queue and registry are not shared across turns.
    pub orchestrator: Arc<Mutex<ChatOrchestrator>>,
}

pub fn create_router(orchestrator: Arc<Mutex<ChatOrchestrator>>) -> Router {
    let state = AppState { orchestrator };

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint - returns OK if the service is running
async fn health_check() -> impl IntoResponse {
    tracing::debug!("Health check requested");
    (StatusCode::OK, "OK")
}

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequestBody>,
) -> Result<Json<ChatResponseBody>, AppError> {
    tracing::info!("Chat request received");

    let mut orchestrator = state.orchestrator.lock().await;
    let response = orchestrator.process_query(&req.message).await?;

    Ok(Json(ChatResponseBody { response }))
}

// Error handling
pub struct AppError(anyhow::Error);

impl From<relay_core::Error> for AppError {
    fn from(err: relay_core::Error) -> Self {
        AppError(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_message = self.0.to_string();
        tracing::error!(error = %error_message, "Chat turn failed");
        let json = serde_json::json!({
            "error": error_message
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json)).into_response()
    }
}
