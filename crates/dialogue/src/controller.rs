//! Turn driver: per-session serialization, stage dispatch, error-to-message
//! conversion, persistence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use kurswissen_core::{Mode, SessionState, Stage, Turn};
use kurswissen_oracle::{ControlIntent, Oracle, OracleCtx, OracleError};
use kurswissen_storage::Storage;
use tokio::sync::Mutex as AsyncMutex;

use crate::{ontology, texts};

/// The single assistant utterance produced by one turn.
pub struct TurnReply {
    pub answer: String,
}

/// Internal reply of a stage handler: the full text plus the question part
/// that goes into the asked log (statements carry none).
pub(crate) struct Utterance {
    pub(crate) text: String,
    pub(crate) asked: Option<String>,
}

impl Utterance {
    pub(crate) fn statement(text: impl Into<String>) -> Self {
        Self { text: text.into(), asked: None }
    }

    pub(crate) fn question(question: impl Into<String>) -> Self {
        let question = question.into();
        Self { text: question.clone(), asked: Some(question) }
    }

    /// A question embedded in longer text (prefix, shortlist, …); only the
    /// question itself is logged for non-repetition.
    pub(crate) fn question_in(text: impl Into<String>, question: impl Into<String>) -> Self {
        Self { text: text.into(), asked: Some(question.into()) }
    }
}

/// Per-request dialogue driver. Owns nothing but handles: the state lives
/// in the storage crate, the classification in the oracle crate.
pub struct DialogueService {
    pub(crate) storage: Arc<Storage>,
    pub(crate) oracle: Arc<dyn Oracle>,
    turn_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl DialogueService {
    #[must_use]
    pub fn new(storage: Arc<Storage>, oracle: Arc<dyn Oracle>) -> Self {
        Self { storage, oracle, turn_locks: StdMutex::new(HashMap::new()) }
    }

    /// Upserts the session and returns the fixed greeting. Idempotent: the
    /// greeting is appended to the transcript at most once; `force` resets
    /// every mutable field first.
    pub async fn start_interview(
        &self,
        session_id: &str,
        mode: Option<Mode>,
        force: bool,
    ) -> TurnReply {
        let lock = self.turn_lock(session_id);
        let _guard = lock.lock().await;

        let existing = self.storage.session(session_id);
        let state = match existing {
            Some(mut state) if !force => {
                if let Some(mode) = mode {
                    state.mode = mode;
                }
                if state.transcript.is_empty() {
                    state.transcript.push(Turn::assistant(texts::GREETING));
                }
                state
            },
            existing => {
                let mode = mode
                    .or_else(|| existing.as_ref().map(|s| s.mode))
                    .unwrap_or_default();
                let mut state = SessionState::new(mode);
                state.transcript.push(Turn::assistant(texts::GREETING));
                state
            },
        };
        self.persist(session_id, state);
        TurnReply { answer: texts::GREETING.to_owned() }
    }

    /// `interview.reset`: same as `start` with `force = true`.
    pub async fn reset_interview(&self, session_id: &str) -> TurnReply {
        self.start_interview(session_id, None, true).await
    }

    /// Handles one user turn. Turns of the same session are strictly
    /// serialized; the transcript grows by exactly one user and one
    /// assistant entry, the asked log by at most one question. All oracle
    /// failures end in a user-visible message, never in an error.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        question: &str,
        mode: Option<Mode>,
    ) -> TurnReply {
        let lock = self.turn_lock(session_id);
        let _guard = lock.lock().await;

        let mut state = self
            .storage
            .session(session_id)
            .unwrap_or_else(|| SessionState::new(mode.unwrap_or_default()));
        if let Some(mode) = mode {
            state.mode = mode;
        }
        state.transcript.push(Turn::user(question));

        let utterance = match self.answer_turn(session_id, &mut state, question).await {
            Ok(utterance) => utterance,
            Err(e) if e.is_quota() => {
                tracing::warn!(session_id, error = %e, "oracle quota exhausted, disabling");
                state.flags.llm_disabled = true;
                state.flags.llm_disabled_reason = Some(texts::QUOTA_REASON.to_owned());
                Utterance::statement(texts::llm_disabled_message(texts::QUOTA_REASON))
            },
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(session_id, error = %e, "oracle rate limited");
                Utterance::statement(texts::MSG_RATE_LIMITED)
            },
            Err(e) => {
                tracing::error!(session_id, error = %e, "oracle call failed");
                Utterance::statement(texts::MSG_TECHNICAL_PROBLEM)
            },
        };

        if let Some(asked) = &utterance.asked {
            state.note_asked(asked);
        }
        state.transcript.push(Turn::assistant(&utterance.text));
        self.persist(session_id, state);
        TurnReply { answer: utterance.text }
    }

    async fn answer_turn(
        &self,
        session_id: &str,
        state: &mut SessionState,
        text: &str,
    ) -> Result<Utterance, OracleError> {
        if state.flags.llm_disabled {
            let reason = state
                .flags
                .llm_disabled_reason
                .clone()
                .unwrap_or_else(|| texts::QUOTA_REASON.to_owned());
            return Ok(Utterance::statement(texts::llm_disabled_message(&reason)));
        }

        if state.mode == Mode::Qa {
            return self.qa_answer(session_id, text).await;
        }

        if !matches!(state.stage, Stage::AwaitSemesterProgress) && ontology::abort_prescreen(text)
        {
            let ctx = OracleCtx::new(session_id, phase_of(&state.stage));
            let intent =
                soften(self.oracle.control_intent(&ctx, text).await, "control_intent")?;
            if intent == ControlIntent::Abort {
                state.clear_current_keep_area();
                let q = texts::fresh_question("", texts::POOL_IDENTIFY, state);
                return Ok(Utterance::question_in(
                    format!("{}{q}", texts::MSG_ABORT_ACK),
                    q,
                ));
            }
        }

        match state.stage.clone() {
            Stage::AwaitSemesterProgress => self.stage_intro(session_id, state, text).await,
            Stage::General => self.stage_general(session_id, state, text).await,
            Stage::TlSearch { wait } => self.stage_tl_search(session_id, state, text, wait).await,
            Stage::InTl { wait } => self.stage_in_tl(session_id, state, text, wait).await,
            Stage::WrapUp => self.stage_wrap_up(session_id, state, text).await,
        }
    }

    pub(crate) fn persist(&self, session_id: &str, state: SessionState) {
        if let Err(e) = self.storage.upsert_session(session_id, state) {
            tracing::error!(session_id, error = %e, "session snapshot write failed");
        }
    }

    pub(crate) fn turn_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks =
            self.turn_locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(session_id.to_owned()).or_default().clone()
    }
}

/// Trace phase name of a stage.
pub(crate) fn phase_of(stage: &Stage) -> &'static str {
    match stage {
        Stage::AwaitSemesterProgress | Stage::General => texts::PHASE_GENERAL,
        Stage::TlSearch { .. } => texts::PHASE_SEARCH,
        Stage::InTl { .. } => texts::PHASE_DEPTH,
        Stage::WrapUp => texts::PHASE_WRAP_UP,
    }
}

/// Downgrades "other" oracle failures to the classifier's deterministic
/// fallback value; quota and rate-limit failures keep propagating so the
/// turn driver can convert them into their fixed messages.
pub(crate) fn soften<T: Default>(
    result: Result<T, OracleError>,
    op: &str,
) -> Result<T, OracleError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_quota() || e.is_rate_limited() => Err(e),
        Err(e) => {
            tracing::warn!(op, error = %e, "classifier degraded, using deterministic fallback");
            Ok(T::default())
        },
    }
}
