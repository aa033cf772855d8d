//! Oracle adapter: the single call boundary to the external LLM.
//!
//! Each classifier has a formal JSON contract; this crate formulates the
//! prompts, enforces JSON-only responses, tags errors as quota / rate-limit
//! / other, retries once against a fallback model, validates and clamps
//! every wire object, and appends a per-session trace record per call.
//! Raw oracle output never reaches the dialogue controller.

#![allow(
    clippy::multiple_inherent_impl,
    reason = "impl blocks split across files for organization"
)]

mod ai_types;
mod classifiers;
mod client;
mod error;
mod trace;
mod types;

use async_trait::async_trait;
use kurswissen_core::{CandidateRef, FactSet, Turn};

pub use ai_types::Message;
pub use client::{truncate, OracleClient, DEFAULT_MODEL};
pub use error::OracleError;
pub use types::{
    CandidateDecision, ControlIntent, EntityScan, IntroFacts, OracleCtx, PhaseQuestion,
    ResolveCandidate, TemporalHint, TitleMatch, TitleWritten, TlResolution, WroteHint,
};

/// The classifier surface the dialogue controller depends on.
///
/// [`OracleClient`] is the production implementation; tests script this
/// trait to drive the state machine deterministically.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Extracts semester and study progress from the first user answer.
    async fn intro_extract(
        &self,
        ctx: &OracleCtx,
        user_text: &str,
    ) -> Result<IntroFacts, OracleError>;

    /// Picks one not-yet-asked question from a phase pool. The optional
    /// hint carries the course's Erfolgskontrolle paragraph in the depth
    /// phase.
    async fn pick_phase_question(
        &self,
        ctx: &OracleCtx,
        phase_name: &str,
        pool: &[&str],
        already_asked: &[String],
        hint: Option<&str>,
    ) -> Result<PhaseQuestion, OracleError>;

    /// Detects course mentions, areas, and temporal/modal cues in a turn.
    async fn detect_entities(
        &self,
        ctx: &OracleCtx,
        user_text: &str,
        history: &[Turn],
        strict_current: bool,
    ) -> Result<EntityScan, OracleError>;

    /// Classifies whether the user wants to abort the current thread.
    async fn control_intent(
        &self,
        ctx: &OracleCtx,
        user_text: &str,
    ) -> Result<ControlIntent, OracleError>;

    /// Pure yes/no: has the user written the given course?
    async fn written(
        &self,
        ctx: &OracleCtx,
        title: &str,
        reply: &str,
    ) -> Result<Option<bool>, OracleError>;

    /// Combined confirm: did the user mean the title, and have they
    /// written it?
    async fn combined_title_written(
        &self,
        ctx: &OracleCtx,
        title: &str,
        reply: &str,
    ) -> Result<TitleWritten, OracleError>;

    /// Resolves a fuzzy course mention against catalog candidates.
    async fn resolve_tl(
        &self,
        ctx: &OracleCtx,
        mention: &str,
        candidates: &[ResolveCandidate],
    ) -> Result<TlResolution, OracleError>;

    /// Interprets the user's reply to a numbered shortlist.
    async fn pick_candidate_from_reply(
        &self,
        ctx: &OracleCtx,
        candidates: &[CandidateRef],
        reply: &str,
    ) -> Result<CandidateDecision, OracleError>;

    /// Extracts fact deltas from a depth-interview answer.
    async fn extract_facts(
        &self,
        ctx: &OracleCtx,
        title: &str,
        answer: &str,
        prev_facts: &FactSet,
    ) -> Result<FactSet, OracleError>;

    /// 3–6 sentence prose summary of the transcript tail.
    async fn summarize_transcript(
        &self,
        ctx: &OracleCtx,
        turns: &[Turn],
    ) -> Result<String, OracleError>;

    /// QA mode: answers a catalog question strictly from the given context.
    async fn answer_question(
        &self,
        ctx: &OracleCtx,
        question: &str,
        context: &str,
    ) -> Result<String, OracleError>;
}
