use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api_types::ConversationsResponse;
use crate::{ApiError, AppState};

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Json<ConversationsResponse> {
    Json(ConversationsResponse { sessions: state.storage.all_sessions() })
}

pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.storage.delete_session(&session_id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session '{session_id}' not found")))
    }
}

pub async fn get_trace(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.storage.read_trace(&session_id)?;
    Ok(([(header::CONTENT_TYPE, "application/jsonl")], content).into_response())
}
