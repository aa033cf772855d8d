//! Stage S3: depth interview for one identified course.

use kurswissen_core::constants::MAX_IN_TL_ROUNDS;
use kurswissen_core::{SessionState, Stage, TlWait};
use kurswissen_oracle::{OracleCtx, OracleError};

use crate::controller::{soften, DialogueService, Utterance};
use crate::texts;

impl DialogueService {
    pub(crate) async fn stage_in_tl(
        &self,
        session_id: &str,
        state: &mut SessionState,
        text: &str,
        wait: TlWait,
    ) -> Result<Utterance, OracleError> {
        state.current.in_tl_rounds += 1;
        if state.current.in_tl_rounds > MAX_IN_TL_ROUNDS {
            state.current.in_tl_rounds = 0;
            state.stage = Stage::WrapUp;
            let question = texts::fresh_question("", texts::POOL_WRAP_UP, state);
            return Ok(Utterance::question(question));
        }

        let ctx = OracleCtx::new(session_id, texts::PHASE_DEPTH);
        let title = state.current.tl_title.clone().unwrap_or_default();

        match wait {
            TlWait::WrittenConfirm => {
                let wrote = soften(self.oracle.written(&ctx, &title, text).await, "written")?;
                match wrote {
                    Some(true) => {
                        state.stage = Stage::InTl { wait: TlWait::Questioning };
                        self.first_tl_question(session_id, state).await
                    },
                    Some(false) => {
                        if let Some(id) = state.current.tl_id.clone() {
                            state.current.declined_written.push(id);
                        }
                        let declined = std::mem::take(&mut state.current.declined_written);
                        state.clear_current_keep_area();
                        state.current.declined_written = declined;
                        Ok(Utterance::question(texts::fresh_question(
                            "",
                            texts::POOL_IDENTIFY,
                            state,
                        )))
                    },
                    None => Ok(Utterance::question(texts::written_reprompt(&title))),
                }
            },
            TlWait::Questioning => {
                let delta = soften(
                    self.oracle
                        .extract_facts(&ctx, &title, text, &state.current.tl_facts)
                        .await,
                    "extract_facts",
                )?;
                state.current.tl_facts = state.current.tl_facts.merged(&delta);
                if let Some(id) = state.current.tl_id.clone() {
                    if let Err(e) = self.storage.save_new_knowledge(
                        &id,
                        session_id,
                        &title,
                        &state.current.tl_facts,
                    ) {
                        tracing::error!(course = %id, error = %e, "knowledge save failed");
                    }
                }
                let question = self.pick_depth_question(&ctx, state).await?;
                Ok(Utterance::question(question))
            },
        }
    }
}
