//! Shared constants for kurswissen.
//!
//! Centralizes the dialogue budgets and thresholds used across crates.

/// Depth-interview rounds for one course before the controller wraps up.
pub const MAX_IN_TL_ROUNDS: u32 = 6;

/// Broad questions asked in the general stage before forcing title search.
pub const MAX_GENERAL_QUESTIONS: u32 = 2;

/// Minimum resolver confidence to accept a course mention.
pub const RESOLVE_CONFIDENCE_MIN: f64 = 0.6;

/// Written probability at or above which the combined confirm step is skipped.
pub const WROTE_PROB_DIRECT: f64 = 0.85;

/// Shortlist size offered when the resolver asks for clarification.
pub const CANDIDATE_SHORTLIST: usize = 3;

/// Transcript tail length fed into the evaluation summary.
pub const SUMMARY_TRANSCRIPT_TURNS: usize = 30;

/// Highest plausible semester number.
pub const MAX_SEMESTER: u8 = 20;

/// Descriptor length above which a course counts as well documented
/// for the least-known tie-breaker.
pub const FAMILIAR_TEXT_LEN: usize = 200;

/// Cap on the prior-entry contribution to the familiarity score.
pub const FAMILIAR_ENTRY_CAP: usize = 2;
