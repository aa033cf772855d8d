//! Mention resolution shared by the general and title-search stages.

use kurswissen_core::constants::{CANDIDATE_SHORTLIST, RESOLVE_CONFIDENCE_MIN, WROTE_PROB_DIRECT};
use kurswissen_core::{clean_title, CandidateRef, PendingTl, SearchWait, SessionState, Stage};
use kurswissen_oracle::{EntityScan, OracleCtx, OracleError, ResolveCandidate};

use crate::controller::{soften, DialogueService, Utterance};
use crate::{ontology, texts};

/// Catalog candidates offered to the oracle resolver.
const RESOLVER_POOL: usize = 5;

/// A course mention resolved to a catalog entry.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedHit {
    pub(crate) id: String,
    /// Cleaned display title.
    pub(crate) title: String,
}

/// Outcome of resolving one mention.
pub(crate) enum Resolution {
    /// Confident match (or direct id hit).
    Direct(ResolvedHit),
    /// The resolver wants the user to choose; top candidates attached.
    Clarify(Vec<CandidateRef>),
    Unresolved,
}

impl DialogueService {
    /// Records the subject area from the entity scan or the deterministic
    /// ontology; an established area is never overwritten with nothing.
    pub(crate) fn note_area(&self, state: &mut SessionState, scan: &EntityScan, text: &str) {
        let area = scan.found_area.clone().or_else(|| ontology::detect_area(text));
        if area.is_some() {
            state.current.area = area;
        }
    }

    /// Course mentions of a turn: the entity scan's list, or a directly
    /// spelled `T-…` id when the scan found nothing.
    pub(crate) fn gather_mentions(&self, scan: &EntityScan, text: &str) -> Vec<String> {
        if !scan.found_tl_list.is_empty() {
            return scan.found_tl_list.clone();
        }
        ontology::find_course_id(text).into_iter().collect()
    }

    /// Resolves every mention, keeping only confident matches.
    pub(crate) async fn resolve_all(
        &self,
        ctx: &OracleCtx,
        mentions: &[String],
    ) -> Result<Vec<ResolvedHit>, OracleError> {
        let mut hits = Vec::new();
        for mention in mentions {
            if let Resolution::Direct(hit) = self.resolve_mention(ctx, mention).await? {
                hits.push(hit);
            }
        }
        Ok(hits)
    }

    /// Least-known selection: minimal familiarity score, ties broken by
    /// input order.
    pub(crate) fn choose_least_known(&self, hits: Vec<ResolvedHit>) -> Option<ResolvedHit> {
        hits.into_iter()
            .enumerate()
            .min_by_key(|(i, hit)| (self.storage.familiarity_score(&hit.id), *i))
            .map(|(_, hit)| hit)
    }

    /// Resolves one free-text mention: direct id fast path, then catalog
    /// fuzzy candidates refined by the oracle resolver.
    pub(crate) async fn resolve_mention(
        &self,
        ctx: &OracleCtx,
        mention: &str,
    ) -> Result<Resolution, OracleError> {
        if let Some(id) = ontology::find_course_id(mention) {
            if let Some(course) = self.storage.entry(&id) {
                return Ok(Resolution::Direct(ResolvedHit {
                    id,
                    title: clean_title(&course.title),
                }));
            }
        }

        let hits = self.storage.candidates(mention, RESOLVER_POOL);
        if hits.is_empty() {
            return Ok(Resolution::Unresolved);
        }
        let candidates: Vec<ResolveCandidate> = hits
            .iter()
            .map(|h| ResolveCandidate {
                id: h.id.clone(),
                title: clean_title(&h.title),
                score: h.score,
            })
            .collect();

        let resolution =
            soften(self.oracle.resolve_tl(ctx, mention, &candidates).await, "resolve_tl")?;

        // Confidence alone gates the direct path; a need-clarify flag next
        // to a confident match does not demote it.
        if let Some(id) = resolution.match_id {
            if resolution.confidence >= RESOLVE_CONFIDENCE_MIN {
                let title = resolution
                    .match_title
                    .map(|t| clean_title(&t))
                    .unwrap_or_else(|| {
                        candidates
                            .iter()
                            .find(|c| c.id == id)
                            .map(|c| c.title.clone())
                            .unwrap_or_default()
                    });
                return Ok(Resolution::Direct(ResolvedHit { id, title }));
            }
        }
        if resolution.need_clarify && candidates.len() >= CANDIDATE_SHORTLIST {
            let shortlist = candidates
                .iter()
                .take(CANDIDATE_SHORTLIST)
                .enumerate()
                .map(|(i, c)| CandidateRef { idx: i + 1, id: c.id.clone(), title: c.title.clone() })
                .collect();
            return Ok(Resolution::Clarify(shortlist));
        }
        Ok(Resolution::Unresolved)
    }

    /// Engages a resolved course: direct depth entry when the written
    /// probability is high enough, the combined confirm prompt otherwise.
    pub(crate) async fn engage_course(
        &self,
        session_id: &str,
        state: &mut SessionState,
        hit: ResolvedHit,
        wrote_prob: Option<f64>,
    ) -> Result<Utterance, OracleError> {
        if wrote_prob.unwrap_or(0.0) >= WROTE_PROB_DIRECT {
            state.enter_in_tl(&hit.id, &hit.title);
            return self.first_tl_question(session_id, state).await;
        }
        let instructor = self.storage.primary_instructor(&hit.id);
        state.current.last_confirm_tl = Some(hit.title.clone());
        let prompt = texts::confirm_prompt(&hit.title, instructor.as_deref());
        state.stage = Stage::TlSearch {
            wait: SearchWait::TitleWrittenConfirm {
                pending: PendingTl { id: hit.id, title: hit.title },
            },
        };
        Ok(Utterance::question(prompt))
    }

    /// First depth question of a freshly entered course, prefixed with the
    /// course opener.
    pub(crate) async fn first_tl_question(
        &self,
        session_id: &str,
        state: &mut SessionState,
    ) -> Result<Utterance, OracleError> {
        let ctx = OracleCtx::new(session_id, texts::PHASE_DEPTH);
        let question = self.pick_depth_question(&ctx, state).await?;
        let title = state.current.tl_title.clone().unwrap_or_default();
        let text = format!("{}{question}", texts::lets_talk_prefix(&title));
        Ok(Utterance::question_in(text, question))
    }

    /// Picks a not-yet-asked depth question, passing the course's
    /// Erfolgskontrolle paragraph as hint.
    pub(crate) async fn pick_depth_question(
        &self,
        ctx: &OracleCtx,
        state: &SessionState,
    ) -> Result<String, OracleError> {
        let hint = state
            .current
            .tl_id
            .as_deref()
            .and_then(|id| self.storage.erfolgskontrolle_text(id));
        let picked = soften(
            self.oracle
                .pick_phase_question(
                    ctx,
                    texts::PHASE_DEPTH,
                    texts::POOL_DEPTH,
                    &state.asked_log,
                    hint.as_deref(),
                )
                .await,
            "pick_phase_question",
        )?;
        Ok(texts::fresh_question(&picked.question, texts::POOL_DEPTH, state))
    }
}
