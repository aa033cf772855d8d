//! HTTP API server (axum).

mod api_error;
mod api_types;
mod handlers;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;
use kurswissen_dialogue::DialogueService;
use kurswissen_storage::Storage;
use tower_http::cors::CorsLayer;

pub use api_error::ApiError;
pub use api_types::*;

/// Shared state of all handlers.
pub struct AppState {
    pub dialogue: Arc<DialogueService>,
    pub storage: Arc<Storage>,
}

/// Builds the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/interview/start", post(handlers::interview_start))
        .route("/api/interview/reset", post(handlers::interview_reset))
        .route("/api/retrieve", post(handlers::retrieve))
        .route("/api/evaluation/start", post(handlers::evaluation_start))
        .route("/api/evaluation/submit", post(handlers::evaluation_submit))
        .route("/api/conversations", get(handlers::list_conversations))
        .route("/api/conversations/:session_id", delete(handlers::delete_conversation))
        .route("/api/traces/:session_id", get(handlers::get_trace))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
