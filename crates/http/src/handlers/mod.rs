mod admin;
mod evaluation;
mod interview;

pub use admin::{delete_conversation, get_trace, list_conversations};
pub use evaluation::{evaluation_start, evaluation_submit};
pub use interview::{interview_reset, interview_start, retrieve};

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}
