//! Request/response DTOs of the API surface.

use std::collections::HashMap;

use kurswissen_core::{Mode, SessionState};
use kurswissen_dialogue::{EvalSchema, NewKnowledgeItem};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub session_id: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveRequest {
    pub session_id: String,
    pub question: String,
    #[serde(default)]
    pub mode: Option<String>,
}

/// Standard turn envelope: one assistant utterance, no sources (the
/// interview core cites nothing).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<Value>,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStartRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationStartResponse {
    pub answer: String,
    pub eval_schema: EvalSchema,
    pub summary: String,
    pub knowledge_markdown: String,
    pub new_knowledge: Vec<NewKnowledgeItem>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationSubmitRequest {
    pub session_id: String,
    pub ratings: HashMap<String, f64>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub corrections: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub sessions: HashMap<String, SessionState>,
}

/// Parses the optional wire mode (`"interview"` / `"qa"`).
pub(crate) fn parse_mode(mode: Option<&str>) -> Result<Option<Mode>, String> {
    match mode {
        None => Ok(None),
        Some("interview") => Ok(Some(Mode::Interview)),
        Some("qa") => Ok(Some(Mode::Qa)),
        Some(other) => Err(format!("unknown mode '{other}'")),
    }
}
