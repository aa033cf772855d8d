//! Stage S2: identifying which course to talk about.

use kurswissen_core::{clean_title, SearchWait, SessionState, Stage};
use kurswissen_oracle::{
    CandidateDecision, EntityScan, OracleCtx, OracleError, TemporalHint, TitleMatch,
};

use crate::controller::{soften, DialogueService, Utterance};
use crate::mention::{Resolution, ResolvedHit};
use crate::texts;

impl DialogueService {
    pub(crate) async fn stage_tl_search(
        &self,
        session_id: &str,
        state: &mut SessionState,
        text: &str,
        wait: SearchWait,
    ) -> Result<Utterance, OracleError> {
        let ctx = OracleCtx::new(session_id, texts::PHASE_SEARCH);
        let scan =
            soften(self.oracle.detect_entities(&ctx, text, &state.transcript, true).await, "detect_entities")?;
        self.note_area(state, &scan, text);

        // Future-tense mentions cannot be interviewed; re-anchor on courses
        // already taken.
        if scan.temporal_hint == TemporalHint::Future {
            state.stage = Stage::TlSearch { wait: SearchWait::Identify };
            let question = texts::fresh_question("", texts::POOL_IDENTIFY_PAST, state);
            return Ok(Utterance::question(question));
        }

        match wait {
            SearchWait::CandidateChoice { candidates } => {
                let decision = soften(
                    self.oracle.pick_candidate_from_reply(&ctx, &candidates, text).await,
                    "pick_candidate_from_reply",
                )?;
                match decision {
                    // Indices are validated at the oracle boundary; an out
                    // of range pick from a foreign implementor degrades to
                    // a rejection.
                    CandidateDecision::Pick(idx)
                        if idx >= 1 && idx <= candidates.len() =>
                    {
                        let chosen = &candidates[idx - 1];
                        let hit = ResolvedHit {
                            id: chosen.id.clone(),
                            title: clean_title(&chosen.title),
                        };
                        self.engage_course(session_id, state, hit, scan.wrote_prob).await
                    },
                    CandidateDecision::Free(title) => {
                        self.identify(session_id, state, &ctx, &title, &scan).await
                    },
                    CandidateDecision::Pick(_) | CandidateDecision::None => {
                        state.stage = Stage::TlSearch { wait: SearchWait::Identify };
                        Ok(Utterance::question(texts::fresh_question(
                            "",
                            texts::POOL_IDENTIFY,
                            state,
                        )))
                    },
                }
            },
            SearchWait::TitleWrittenConfirm { pending } => {
                let verdict = soften(
                    self.oracle.combined_title_written(&ctx, &pending.title, text).await,
                    "combined_title_written",
                )?;
                match (verdict.title_match, verdict.wrote) {
                    (TitleMatch::Yes, Some(true)) => {
                        state.enter_in_tl(&pending.id, &pending.title);
                        self.first_tl_question(session_id, state).await
                    },
                    (TitleMatch::Yes, Some(false)) => {
                        state.current.declined_written.push(pending.id.clone());
                        state.current.last_confirm_tl = None;
                        state.stage = Stage::TlSearch { wait: SearchWait::Identify };
                        Ok(Utterance::question(texts::fresh_question(
                            "",
                            texts::POOL_IDENTIFY,
                            state,
                        )))
                    },
                    (TitleMatch::Yes, None) => {
                        // Title confirmed, written still open: pure yes/no.
                        state.enter_in_tl(&pending.id, &pending.title);
                        state.stage =
                            Stage::InTl { wait: kurswissen_core::TlWait::WrittenConfirm };
                        Ok(Utterance::question(texts::written_reprompt(&pending.title)))
                    },
                    (TitleMatch::No, _) => {
                        state.current.last_confirm_tl = None;
                        state.stage = Stage::TlSearch { wait: SearchWait::Identify };
                        Ok(Utterance::question(texts::fresh_question(
                            "",
                            texts::POOL_IDENTIFY,
                            state,
                        )))
                    },
                    (TitleMatch::Unclear, _) => {
                        let instructor = self.storage.primary_instructor(&pending.id);
                        let prompt =
                            texts::confirm_prompt(&pending.title, instructor.as_deref());
                        state.stage = Stage::TlSearch {
                            wait: SearchWait::TitleWrittenConfirm { pending },
                        };
                        Ok(Utterance::question(prompt))
                    },
                }
            },
            SearchWait::Identify => {
                let mention =
                    scan.found_tl_text.clone().unwrap_or_else(|| text.trim().to_owned());
                self.identify(session_id, state, &ctx, &mention, &scan).await
            },
        }
    }

    /// Resolves a mention and routes into confirm, shortlist, or a new
    /// identification question.
    pub(crate) async fn identify(
        &self,
        session_id: &str,
        state: &mut SessionState,
        ctx: &OracleCtx,
        mention: &str,
        scan: &EntityScan,
    ) -> Result<Utterance, OracleError> {
        match self.resolve_mention(ctx, mention).await? {
            Resolution::Direct(hit) => {
                self.engage_course(session_id, state, hit, scan.wrote_prob).await
            },
            Resolution::Clarify(candidates) => {
                let prompt = texts::candidate_list_prompt(&candidates);
                state.stage = Stage::TlSearch { wait: SearchWait::CandidateChoice { candidates } };
                Ok(Utterance::question(prompt))
            },
            Resolution::Unresolved => {
                state.stage = Stage::TlSearch { wait: SearchWait::Identify };
                Ok(Utterance::question(texts::fresh_question("", texts::POOL_IDENTIFY, state)))
            },
        }
    }
}
