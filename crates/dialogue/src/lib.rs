//! Dialogue controller: the per-session interview state machine.
//!
//! One user turn in, exactly one assistant utterance out. Every turn is
//! serialized per session, classified through the oracle adapter with
//! deterministic fallbacks, and persisted to the session snapshot before
//! the reply leaves the crate.

#![allow(
    clippy::multiple_inherent_impl,
    reason = "impl blocks split across stage files for organization"
)]

mod controller;
mod error;
mod evaluation;
mod general;
mod in_tl;
mod intro;
mod mention;
mod ontology;
mod qa;
pub mod texts;
mod tl_search;
mod wrap_up;

pub use controller::{DialogueService, TurnReply};
pub use error::{DialogueError, Result};
pub use evaluation::{
    eval_schema, EvalItem, EvalSchema, EvalScale, EvaluationStart, NewKnowledgeItem,
};
pub use ontology::{abort_prescreen, detect_area, find_course_id};
