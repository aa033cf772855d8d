//! Stage S4: the phase-4 question has been asked; the answer flows back
//! into title search (it usually already names the next course).

use kurswissen_core::{SearchWait, SessionState, Stage};
use kurswissen_oracle::OracleError;

use crate::controller::{DialogueService, Utterance};

impl DialogueService {
    pub(crate) async fn stage_wrap_up(
        &self,
        session_id: &str,
        state: &mut SessionState,
        text: &str,
    ) -> Result<Utterance, OracleError> {
        state.stage = Stage::TlSearch { wait: SearchWait::Identify };
        self.stage_tl_search(session_id, state, text, SearchWait::Identify).await
    }
}
