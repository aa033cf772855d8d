use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::api_types::{parse_mode, AnswerResponse, ResetRequest, RetrieveRequest, StartRequest};
use crate::{ApiError, AppState};

fn require_session_id(session_id: &str) -> Result<(), ApiError> {
    if session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("sessionId must not be empty".to_owned()));
    }
    Ok(())
}

pub async fn interview_start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    require_session_id(&req.session_id)?;
    let mode = parse_mode(req.mode.as_deref()).map_err(ApiError::BadRequest)?;
    let reply = state.dialogue.start_interview(&req.session_id, mode, req.force).await;
    Ok(Json(AnswerResponse {
        answer: reply.answer,
        sources: Vec::new(),
        session_id: req.session_id,
    }))
}

pub async fn interview_reset(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    require_session_id(&req.session_id)?;
    let reply = state.dialogue.reset_interview(&req.session_id).await;
    Ok(Json(AnswerResponse {
        answer: reply.answer,
        sources: Vec::new(),
        session_id: req.session_id,
    }))
}

pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    require_session_id(&req.session_id)?;
    if req.question.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_owned()));
    }
    let mode = parse_mode(req.mode.as_deref()).map_err(ApiError::BadRequest)?;
    let reply = state.dialogue.handle_turn(&req.session_id, &req.question, mode).await;
    Ok(Json(AnswerResponse {
        answer: reply.answer,
        sources: Vec::new(),
        session_id: req.session_id,
    }))
}
