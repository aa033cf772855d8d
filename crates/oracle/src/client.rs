use std::path::PathBuf;

use kurswissen_core::strip_markdown_json;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::ai_types::{ChatRequest, ChatResponse, Message, ResponseFormat};
use crate::error::OracleError;
use crate::trace::{self, TraceRecord};
use crate::types::OracleCtx;

/// Default model when `KURSWISSEN_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Body markers that turn a 429 into the sticky quota error.
const QUOTA_MARKERS: [&str; 2] = ["insufficient_quota", "exceeded your current quota"];

/// System message prepended when a JSON contract is requested but no
/// prompt mentions the word "json" (strict oracles reject that).
const JSON_ENFORCER: &str =
    "Antworte ausschließlich mit einem reinen JSON-Objekt, ohne Markdown und ohne weiteren Text.";

/// Client for the external LLM, the single call boundary of the system.
#[derive(Debug)]
pub struct OracleClient {
    pub(crate) client: reqwest::Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) fallback_model: Option<String>,
    pub(crate) trace_dir: PathBuf,
}

impl OracleClient {
    /// Creates a new client. `trace_dir` must exist; records are appended
    /// to `<trace_dir>/<session_id>.jsonl`.
    #[must_use]
    pub fn new(api_key: String, base_url: String, trace_dir: PathBuf) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model: DEFAULT_MODEL.to_owned(),
            fallback_model: None,
            trace_dir,
        }
    }

    /// Sets the primary model.
    #[must_use]
    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    /// Sets the fallback model tried once on non-quota failures.
    #[must_use]
    pub fn with_fallback_model(mut self, model: Option<String>) -> Self {
        self.fallback_model = model;
        self
    }

    /// Returns the primary model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one chat call and returns the raw content string.
    ///
    /// When `json` is requested the JSON-only contract is enforced (see
    /// [`JSON_ENFORCER`]). On any non-quota failure the call is retried
    /// exactly once against the fallback model if one is configured and
    /// differs from the primary. Quota errors are never retried. One trace
    /// record is appended per invocation, success or failure.
    ///
    /// # Errors
    /// Returns the taxonomy-tagged [`OracleError`] of the final attempt.
    pub async fn chat(
        &self,
        ctx: &OracleCtx,
        op: &str,
        mut messages: Vec<Message>,
        json: bool,
    ) -> Result<String, OracleError> {
        if json && !messages.iter().any(|m| m.content.to_lowercase().contains("json")) {
            messages.insert(0, Message::system(JSON_ENFORCER));
        }

        let mut result = self.attempt(&self.model, &messages, json).await;
        let retry_model = match &result {
            Err(e) if !e.is_quota() => {
                self.fallback_model.clone().filter(|fb| *fb != self.model)
            },
            _ => None,
        };
        if let Some(fallback) = retry_model {
            tracing::warn!(op, fallback, "primary model failed, retrying against fallback");
            result = self.attempt(&fallback, &messages, json).await;
        }

        let output = match &result {
            Ok(content) => json!(content),
            Err(e) => json!({ "error": e.to_string() }),
        };
        trace::append(
            &self.trace_dir,
            &TraceRecord {
                ts: chrono::Utc::now(),
                session_id: &ctx.session_id,
                op,
                phase: &ctx.phase,
                messages: &messages,
                output,
            },
        );
        result
    }

    /// Sends one JSON-contract call and parses the content into `T`.
    ///
    /// # Errors
    /// As [`OracleClient::chat`], plus `JsonParse` when the content is not
    /// valid JSON for `T` even after fence stripping.
    pub async fn chat_parsed<T: DeserializeOwned>(
        &self,
        ctx: &OracleCtx,
        op: &str,
        messages: Vec<Message>,
    ) -> Result<T, OracleError> {
        let content = self.chat(ctx, op, messages, true).await?;
        let stripped = strip_markdown_json(&content);
        serde_json::from_str(stripped).map_err(|source| OracleError::JsonParse {
            context: format!("{op} (content: {})", truncate(&content, 300)),
            source,
        })
    }

    async fn attempt(
        &self,
        model: &str,
        messages: &[Message],
        json: bool,
    ) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: model.to_owned(),
            messages: messages.to_vec(),
            response_format: json.then(ResponseFormat::json_object),
            temperature: Some(0.0),
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "could not read body".to_owned());

        if !status.is_success() {
            let code = status.as_u16();
            if code == 429 {
                let lowered = body.to_lowercase();
                if QUOTA_MARKERS.iter().any(|m| lowered.contains(m)) {
                    return Err(OracleError::QuotaExhausted(body));
                }
                return Err(OracleError::RateLimited(body));
            }
            return Err(OracleError::Api { status: code, body });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|source| OracleError::JsonParse {
                context: format!("chat response (body: {})", truncate(&body, 300)),
                source,
            })?;
        let first = parsed.choices.into_iter().next().ok_or(OracleError::EmptyResponse)?;
        Ok(first.message.content)
    }
}

/// Truncates a string to `max_len` bytes at a char boundary.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.get(..end).unwrap_or("")
}
