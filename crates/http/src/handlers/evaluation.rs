use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::api_types::{
    EvaluationStartRequest, EvaluationStartResponse, EvaluationSubmitRequest, MessageResponse,
};
use crate::{ApiError, AppState};

pub async fn evaluation_start(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluationStartRequest>,
) -> Result<Json<EvaluationStartResponse>, ApiError> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("sessionId must not be empty".to_owned()));
    }
    let start = state.dialogue.start_evaluation(&req.session_id).await?;
    Ok(Json(EvaluationStartResponse {
        answer: start.answer,
        eval_schema: start.eval_schema,
        summary: start.summary,
        knowledge_markdown: start.knowledge_markdown,
        new_knowledge: start.new_knowledge,
        session_id: req.session_id,
    }))
}

pub async fn evaluation_submit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluationSubmitRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.session_id.trim().is_empty() {
        return Err(ApiError::BadRequest("sessionId must not be empty".to_owned()));
    }
    let message = state
        .dialogue
        .submit_evaluation(&req.session_id, &req.ratings, &req.comments, &req.corrections)
        .await?;
    Ok(Json(MessageResponse { message, session_id: req.session_id }))
}
