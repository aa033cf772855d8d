//! Stage S0: semester and progress extraction from the first answer.

use kurswissen_core::SessionState;
use kurswissen_oracle::{OracleCtx, OracleError};

use crate::controller::{soften, DialogueService, Utterance};
use crate::texts;

impl DialogueService {
    pub(crate) async fn stage_intro(
        &self,
        session_id: &str,
        state: &mut SessionState,
        text: &str,
    ) -> Result<Utterance, OracleError> {
        let ctx = OracleCtx::new(session_id, texts::PHASE_GENERAL);
        let facts = soften(self.oracle.intro_extract(&ctx, text).await, "intro_extract")?;
        state.general.semester = facts.semester;
        state.general.progress_percent = facts.progress_percent;
        self.general_question(&ctx, state).await
    }
}
