//! Per-session dialogue state.
//!
//! The dialogue controller owns exactly one [`SessionState`] per session id.
//! Stage sub-states ("awaiting" situations) are nested variants of [`Stage`],
//! so at most one of them can hold at any moment, a candidate shortlist
//! exists exactly while a choice is pending, and a pending course exists
//! exactly while the combined title/written confirm is pending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::{MAX_IN_TL_ROUNDS, MAX_SEMESTER};
use crate::facts::FactSet;

/// Dialogue mode of a session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Structured interview eliciting tacit course knowledge.
    #[default]
    Interview,
    /// Catalog question answering.
    Qa,
}

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One transcript turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Optional controller annotations (stage at emit time, oracle op, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl Turn {
    /// Creates a user turn stamped now.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), timestamp: Utc::now(), meta: None }
    }

    /// Creates an assistant turn stamped now.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), timestamp: Utc::now(), meta: None }
    }
}

/// A numbered shortlist entry offered to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateRef {
    /// 1-based display index.
    pub idx: usize,
    pub id: String,
    pub title: String,
}

/// A resolved course waiting for the combined "meant this / written?" confirm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingTl {
    pub id: String,
    pub title: String,
}

/// Sub-state of the title-identification stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchWait {
    /// Asking for a course title.
    #[default]
    Identify,
    /// A numbered shortlist was presented; waiting for the pick.
    CandidateChoice { candidates: Vec<CandidateRef> },
    /// A single candidate was presented; waiting for the combined confirm.
    TitleWrittenConfirm { pending: PendingTl },
}

/// Sub-state of the depth-interview stage.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TlWait {
    /// Normal question/answer rounds.
    #[default]
    Questioning,
    /// Waiting for a pure yes/no on "have you written it?".
    WrittenConfirm,
}

/// Interview stage, one transition per user turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Stage {
    /// Initial stage after the greeting.
    #[default]
    AwaitSemesterProgress,
    /// Broad questioning before a course is on the table.
    General,
    /// Identifying which course to talk about.
    TlSearch {
        #[serde(default)]
        wait: SearchWait,
    },
    /// Depth interview for one identified course.
    InTl {
        #[serde(default)]
        wait: TlWait,
    },
    /// One transition question before returning to title search.
    WrapUp,
}

impl Stage {
    /// Wire-facing stage name, stable across sub-states.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AwaitSemesterProgress => "await_semester_progress",
            Self::General => "general",
            Self::TlSearch { .. } => "tl_search",
            Self::InTl { .. } => "in_tl",
            Self::WrapUp => "wrap_up",
        }
    }
}

/// Broad facts about the student, filled by the intro extractor.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneralInfo {
    /// Current semester, 1..=20.
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub semester: Option<u8>,
    /// Self-reported study progress, 0..=100 percent.
    #[serde(default, deserialize_with = "lenient_opt_u8")]
    pub progress_percent: Option<u8>,
}

/// Turn counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counters {
    /// General-stage questions asked so far.
    #[serde(default)]
    pub general_q: u32,
}

/// Degradation flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flags {
    /// Sticky: set when the oracle reported exhausted quota.
    #[serde(default)]
    pub llm_disabled: bool,
    /// User-visible reason shown on every turn while disabled.
    #[serde(default)]
    pub llm_disabled_reason: Option<String>,
}

/// Evaluation form progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvalState {
    InProgress,
    Done,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    #[serde(default)]
    pub state: Option<EvalState>,
    #[serde(default)]
    pub index: usize,
    /// Submitted ratings as `{id, rating}` records.
    #[serde(default)]
    pub answers: Vec<Value>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub corrections: String,
}

/// Per-course working set of the dialogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CurrentTl {
    /// Detected subject area ("Hauptfach"), survives aborts.
    #[serde(default)]
    pub area: Option<String>,
    /// Resolved course id while in the depth interview.
    #[serde(default)]
    pub tl_id: Option<String>,
    /// Resolved course title (cleaned).
    #[serde(default)]
    pub tl_title: Option<String>,
    /// Facts collected for the current course in this session.
    #[serde(default)]
    pub tl_facts: FactSet,
    /// Depth rounds spent on the current course.
    #[serde(default)]
    pub in_tl_rounds: u32,
    /// Course ids the user said they have not written.
    #[serde(default)]
    pub declined_written: Vec<String>,
    /// Last course title a confirm prompt was emitted for.
    #[serde(default)]
    pub last_confirm_tl: Option<String>,
}

/// Complete serializable state of one dialogue session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default)]
    pub general: GeneralInfo,
    #[serde(default)]
    pub counters: Counters,
    /// Assistant questions already emitted; never contains duplicates.
    #[serde(default)]
    pub asked_log: Vec<String>,
    #[serde(default)]
    pub transcript: Vec<Turn>,
    #[serde(default)]
    pub current: CurrentTl,
    #[serde(default)]
    pub flags: Flags,
    #[serde(default)]
    pub evaluation: Evaluation,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            started_at: Utc::now(),
            stage: Stage::default(),
            general: GeneralInfo::default(),
            counters: Counters::default(),
            asked_log: Vec::new(),
            transcript: Vec::new(),
            current: CurrentTl::default(),
            flags: Flags::default(),
            evaluation: Evaluation::default(),
        }
    }
}

impl SessionState {
    /// Creates a fresh session in the given mode.
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self { mode, ..Self::default() }
    }

    /// Resets every mutable field, keeping only the mode. Used by
    /// `interview.start(force)` and `interview.reset`.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }

    /// Enters the depth interview for a resolved course, resetting the
    /// round counter and the collected facts.
    pub fn enter_in_tl(&mut self, id: impl Into<String>, title: impl Into<String>) {
        self.current.tl_id = Some(id.into());
        self.current.tl_title = Some(title.into());
        self.current.tl_facts = FactSet::default();
        self.current.in_tl_rounds = 0;
        self.stage = Stage::InTl { wait: TlWait::Questioning };
    }

    /// Clears the per-course working set except the area, then re-enters
    /// title search. Used on abort and after a declined course.
    pub fn clear_current_keep_area(&mut self) {
        let area = self.current.area.take();
        self.current = CurrentTl { area, ..CurrentTl::default() };
        self.stage = Stage::TlSearch { wait: SearchWait::Identify };
    }

    /// Records an emitted assistant question. Duplicates are ignored so the
    /// non-repetition invariant holds even on a defensive double call.
    pub fn note_asked(&mut self, question: &str) {
        if !self.asked_log.iter().any(|q| q == question) {
            self.asked_log.push(question.to_owned());
        }
    }

    /// Re-applies defaults and coerces every field into its documented
    /// range. Run on every session loaded from a snapshot; idempotent, so
    /// `sanitize(sanitize(x)) == sanitize(x)`.
    pub fn sanitize(&mut self) {
        self.general.semester = self.general.semester.filter(|s| (1..=MAX_SEMESTER).contains(s));
        self.general.progress_percent = self.general.progress_percent.filter(|p| *p <= 100);
        self.current.in_tl_rounds = self.current.in_tl_rounds.min(MAX_IN_TL_ROUNDS);
        self.current.tl_facts.sanitize();
        crate::facts::dedup_keep_first(&mut self.current.declined_written);
        crate::facts::dedup_keep_first(&mut self.asked_log);

        // Stage coherence: an empty shortlist cannot await a choice.
        if let Stage::TlSearch { wait: SearchWait::CandidateChoice { candidates } } = &self.stage {
            if candidates.is_empty() {
                self.stage = Stage::TlSearch { wait: SearchWait::Identify };
            }
        }
        // The depth interview needs a resolved course.
        if matches!(self.stage, Stage::InTl { .. }) && self.current.tl_id.is_none() {
            self.stage = Stage::TlSearch { wait: SearchWait::Identify };
        }
        if !self.flags.llm_disabled {
            self.flags.llm_disabled_reason = None;
        }
    }
}

/// Accepts numbers or numeric strings for small integer fields; anything
/// out of u8 range or unparsable becomes `None` instead of failing the
/// whole snapshot.
fn lenient_opt_u8<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && *f <= f64::from(u8::MAX))
            .map(|f| f.round() as u8),
        Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    }))
}
