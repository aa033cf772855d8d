//! Typed classifier outputs.
//!
//! Raw oracle JSON never crosses the crate boundary: every classifier
//! validates and clamps its wire object into one of these types first.

use serde::{Deserialize, Serialize};

/// Output of the intro extractor: semester and progress, already clamped
/// into their documented ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntroFacts {
    pub semester: Option<u8>,
    pub progress_percent: Option<u8>,
}

/// A phase question chosen by the oracle.
#[derive(Debug, Clone, Default)]
pub struct PhaseQuestion {
    pub question: String,
    pub rationale: String,
}

/// Whether a mention refers to the past, the future, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemporalHint {
    Past,
    Future,
    Mixed,
    #[default]
    Unknown,
}

/// Confidence bucket for "has already written it".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WroteHint {
    High,
    Medium,
    Low,
}

/// Entities and cues detected in one user turn.
#[derive(Debug, Clone, Default)]
pub struct EntityScan {
    /// Subject area ("Hauptfach") if one was named.
    pub found_area: Option<String>,
    /// The single most salient course mention.
    pub found_tl_text: Option<String>,
    /// All course mentions, in input order.
    pub found_tl_list: Vec<String>,
    pub mentions_thesis: bool,
    pub thesis_topic: Option<String>,
    pub temporal_hint: TemporalHint,
    /// Probability the user already wrote the mentioned course, in [0, 1].
    pub wrote_prob: Option<f64>,
    pub wrote_hint: Option<WroteHint>,
}

/// Dialogue control intent of a user turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControlIntent {
    Abort,
    /// Deterministic fallback when the classifier is unavailable.
    #[default]
    Continue,
}

/// Answer bucket of the combined "meant this title?" classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    Yes,
    No,
    Unclear,
}

/// Output of the combined title/written classifier.
#[derive(Debug, Clone, Copy)]
pub struct TitleWritten {
    pub title_match: TitleMatch,
    /// `None` when the reply did not settle the written question.
    pub wrote: Option<bool>,
}

impl Default for TitleWritten {
    /// Deterministic fallback: unclear reply, written question open.
    fn default() -> Self {
        Self { title_match: TitleMatch::Unclear, wrote: None }
    }
}

/// A catalog candidate offered to the resolver.
#[derive(Debug, Clone)]
pub struct ResolveCandidate {
    pub id: String,
    pub title: String,
    pub score: f64,
}

/// Output of the mention resolver.
#[derive(Debug, Clone, Default)]
pub struct TlResolution {
    pub match_id: Option<String>,
    pub match_title: Option<String>,
    /// Clamped into [0, 1]; 0 when the oracle omitted it.
    pub confidence: f64,
    pub need_clarify: bool,
    pub clarify_question: Option<String>,
}

/// What the user did with a numbered shortlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CandidateDecision {
    /// Picked entry `idx` (1-based, as displayed).
    Pick(usize),
    /// Rejected the whole list.
    #[default]
    None,
    /// Offered a different free-text title.
    Free(String),
}

/// Call context threaded through every classifier for tracing.
#[derive(Debug, Clone)]
pub struct OracleCtx {
    pub session_id: String,
    /// Interview phase the call belongs to (trace field).
    pub phase: String,
}

impl OracleCtx {
    #[must_use]
    pub fn new(session_id: impl Into<String>, phase: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), phase: phase.into() }
    }
}
