//! QA mode: catalog question answering grounded in descriptor texts.

use kurswissen_core::clean_title;
use kurswissen_oracle::{truncate, OracleCtx, OracleError};

use crate::controller::{DialogueService, Utterance};
use crate::texts;

/// Courses whose descriptors form the answer context.
const CONTEXT_COURSES: usize = 4;
/// Per-course descriptor budget in the prompt.
const CONTEXT_CHARS: usize = 1500;

impl DialogueService {
    pub(crate) async fn qa_answer(
        &self,
        session_id: &str,
        question: &str,
    ) -> Result<Utterance, OracleError> {
        let ctx = OracleCtx::new(session_id, texts::PHASE_QA);
        let hits = self.storage.candidates(question, CONTEXT_COURSES);

        let mut context = String::new();
        for hit in &hits {
            if let Some(course) = self.storage.entry(&hit.id) {
                if course.text.trim().is_empty() {
                    continue;
                }
                context.push_str(&format!(
                    "## {} ({})\n{}\n\n",
                    clean_title(&course.title),
                    course.id,
                    truncate(&course.text, CONTEXT_CHARS)
                ));
            }
        }
        if context.is_empty() {
            return Ok(Utterance::statement(texts::MSG_QA_UNKNOWN));
        }

        let answer = self.oracle.answer_question(&ctx, question, &context).await?;
        let answer = if answer.trim().is_empty() {
            texts::MSG_QA_UNKNOWN.to_owned()
        } else {
            answer
        };
        Ok(Utterance::statement(answer))
    }
}
