//! Stage S1: broad questioning until a course mention resolves.

use kurswissen_core::constants::MAX_GENERAL_QUESTIONS;
use kurswissen_core::{SearchWait, SessionState, Stage};
use kurswissen_oracle::{OracleCtx, OracleError};

use crate::controller::{soften, DialogueService, Utterance};
use crate::texts;

impl DialogueService {
    pub(crate) async fn stage_general(
        &self,
        session_id: &str,
        state: &mut SessionState,
        text: &str,
    ) -> Result<Utterance, OracleError> {
        let ctx = OracleCtx::new(session_id, texts::PHASE_GENERAL);
        let scan =
            soften(self.oracle.detect_entities(&ctx, text, &state.transcript, false).await, "detect_entities")?;
        self.note_area(state, &scan, text);

        let mentions = self.gather_mentions(&scan, text);
        if mentions.is_empty() {
            return self.general_question(&ctx, state).await;
        }

        let resolved = self.resolve_all(&ctx, &mentions).await?;
        match self.choose_least_known(resolved) {
            Some(hit) => self.engage_course(session_id, state, hit, scan.wrote_prob).await,
            None => self.general_question(&ctx, state).await,
        }
    }

    /// Emits the next general question and moves to title search once the
    /// general-question budget is spent.
    pub(crate) async fn general_question(
        &self,
        ctx: &OracleCtx,
        state: &mut SessionState,
    ) -> Result<Utterance, OracleError> {
        let picked = soften(
            self.oracle
                .pick_phase_question(
                    ctx,
                    texts::PHASE_GENERAL,
                    texts::POOL_GENERAL,
                    &state.asked_log,
                    None,
                )
                .await,
            "pick_phase_question",
        )?;
        let question = texts::fresh_question(&picked.question, texts::POOL_GENERAL, state);
        state.counters.general_q += 1;
        state.stage = if state.counters.general_q >= MAX_GENERAL_QUESTIONS {
            Stage::TlSearch { wait: SearchWait::Identify }
        } else {
            Stage::General
        };
        Ok(Utterance::question(question))
    }
}
