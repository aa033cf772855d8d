//! Evaluation entry points: summary, per-course knowledge narrative,
//! rating schema, and the submissions log.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::Utc;
use kurswissen_core::constants::SUMMARY_TRANSCRIPT_TURNS;
use kurswissen_core::{EvalState, FactSet, Turn};
use kurswissen_oracle::OracleCtx;
use kurswissen_storage::{EvaluationRecord, StorageError};
use serde::Serialize;

use crate::controller::DialogueService;
use crate::error::{DialogueError, Result};
use crate::texts;

/// One rating item of the evaluation form.
#[derive(Debug, Clone, Serialize)]
pub struct EvalItem {
    pub id: &'static str,
    pub prompt: &'static str,
}

/// Rating scale with endpoint labels.
#[derive(Debug, Clone, Serialize)]
pub struct EvalScale {
    pub min: u8,
    pub max: u8,
    pub labels: BTreeMap<u8, &'static str>,
}

/// The evaluation form schema served to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct EvalSchema {
    pub items: Vec<EvalItem>,
    pub scale: EvalScale,
}

/// Per-course aggregate returned by `evaluation.start`.
#[derive(Debug, Clone, Serialize)]
pub struct NewKnowledgeItem {
    pub id: String,
    pub title: String,
    pub facts: FactSet,
}

/// Full `evaluation.start` payload.
#[derive(Debug, Serialize)]
pub struct EvaluationStart {
    pub answer: String,
    pub summary: String,
    pub eval_schema: EvalSchema,
    pub knowledge_markdown: String,
    pub new_knowledge: Vec<NewKnowledgeItem>,
}

/// The fixed form: five items on a 1..5 agreement scale.
#[must_use]
pub fn eval_schema() -> EvalSchema {
    EvalSchema {
        items: vec![
            EvalItem { id: "clarity", prompt: "Die Fragen des Interviews waren klar verständlich." },
            EvalItem { id: "relevance", prompt: "Die Fragen waren für meine Studienerfahrung relevant." },
            EvalItem { id: "pace", prompt: "Das Tempo des Interviews war angenehm." },
            EvalItem { id: "trust", prompt: "Dem gesammelten Wissen würde ich vertrauen." },
            EvalItem { id: "overall", prompt: "Insgesamt war das Interview hilfreich." },
        ],
        scale: EvalScale {
            min: 1,
            max: 5,
            labels: BTreeMap::from([(1, "trifft gar nicht zu"), (5, "trifft voll zu")]),
        },
    }
}

impl DialogueService {
    /// Starts the evaluation: oracle summary over the transcript tail,
    /// per-course fact aggregate, Markdown narrative. The interview stage
    /// is left unchanged.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session.
    pub async fn start_evaluation(&self, session_id: &str) -> Result<EvaluationStart> {
        let lock = self.turn_lock(session_id);
        let _guard = lock.lock().await;
        let mut state = self.storage.session(session_id).ok_or_else(|| {
            StorageError::NotFound { entity: "session", id: session_id.to_owned() }
        })?;
        state.evaluation.state = Some(EvalState::InProgress);

        let tail_start = state.transcript.len().saturating_sub(SUMMARY_TRANSCRIPT_TURNS);
        let tail: Vec<Turn> = state.transcript[tail_start..].to_vec();
        let summary = if state.flags.llm_disabled || tail.is_empty() {
            fallback_summary()
        } else {
            let ctx = OracleCtx::new(session_id, texts::PHASE_EVALUATION);
            match self.oracle.summarize_transcript(&ctx, &tail).await {
                Ok(s) if !s.trim().is_empty() => s,
                Ok(_) => fallback_summary(),
                Err(e) if e.is_quota() => {
                    state.flags.llm_disabled = true;
                    state.flags.llm_disabled_reason = Some(texts::QUOTA_REASON.to_owned());
                    fallback_summary()
                },
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "summary degraded");
                    fallback_summary()
                },
            }
        };

        let new_knowledge: Vec<NewKnowledgeItem> = self
            .storage
            .session_knowledge(session_id)
            .into_iter()
            .map(|(id, title, facts)| NewKnowledgeItem { id, title, facts })
            .collect();
        let knowledge_markdown = render_knowledge_markdown(&new_knowledge);

        state.transcript.push(Turn::assistant(texts::MSG_EVAL_INTRO));
        self.persist(session_id, state);

        Ok(EvaluationStart {
            answer: texts::MSG_EVAL_INTRO.to_owned(),
            summary,
            eval_schema: eval_schema(),
            knowledge_markdown,
            new_knowledge,
        })
    }

    /// Validates and records a submitted evaluation form.
    ///
    /// # Errors
    /// `InvalidInput` when any rating is not a finite number in 1..=5;
    /// `NotFound` for an unknown session; storage errors from the log
    /// append.
    pub async fn submit_evaluation(
        &self,
        session_id: &str,
        ratings: &HashMap<String, f64>,
        comments: &str,
        corrections: &str,
    ) -> Result<String> {
        for (id, rating) in ratings {
            if !rating.is_finite() || !(1.0..=5.0).contains(rating) {
                return Err(DialogueError::InvalidInput(format!(
                    "rating '{id}' must be a number between 1 and 5"
                )));
            }
        }

        let lock = self.turn_lock(session_id);
        let _guard = lock.lock().await;
        let mut state = self.storage.session(session_id).ok_or_else(|| {
            StorageError::NotFound { entity: "session", id: session_id.to_owned() }
        })?;

        state.evaluation.state = Some(EvalState::Done);
        state.evaluation.answers = ratings
            .iter()
            .map(|(id, rating)| serde_json::json!({ "id": id, "rating": rating }))
            .collect();
        state.evaluation.comments = comments.to_owned();
        state.evaluation.corrections = corrections.to_owned();

        self.storage.append_evaluation(&EvaluationRecord {
            ts: Utc::now(),
            session_id: session_id.to_owned(),
            ratings: ratings.clone(),
            comments: comments.to_owned(),
            corrections: corrections.to_owned(),
        })?;

        state.transcript.push(Turn::assistant(texts::MSG_EVAL_THANKS));
        self.persist(session_id, state);
        Ok(texts::MSG_EVAL_THANKS.to_owned())
    }
}

fn fallback_summary() -> String {
    "Eine Zusammenfassung des Gesprächs ist derzeit nicht verfügbar.".to_owned()
}

/// Renders the per-course knowledge narrative: one `###` section per
/// course, one paragraph of sentences composed from the facts.
#[must_use]
pub(crate) fn render_knowledge_markdown(items: &[NewKnowledgeItem]) -> String {
    if items.is_empty() {
        return "_In dieser Sitzung wurde noch kein neues Wissen gesammelt._".to_owned();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "### {} ({})", item.title, item.id);
        out.push('\n');
        out.push_str(&facts_paragraph(&item.facts));
        out.push_str("\n\n");
    }
    out.trim_end().to_owned()
}

fn facts_paragraph(facts: &FactSet) -> String {
    let mut sentences: Vec<String> = Vec::new();
    if let Some(exam) = facts.exam_type {
        sentences.push(format!("Die Prüfung ist {}.", exam.as_str()));
    }
    if let Some(difficulty) = facts.difficulty_1_5 {
        sentences.push(format!(
            "Die Schwierigkeit wird mit {difficulty}/5 ({}) eingeschätzt.",
            texts::difficulty_label(difficulty)
        ));
    }
    if let Some(weeks) = facts.prep_weeks {
        let unit = if (weeks - 1.0).abs() < f64::EPSILON { "Woche" } else { "Wochen" };
        sentences.push(format!("Die gezielte Vorbereitung dauerte etwa {} {unit}.", fmt_number(weeks)));
    }
    if let Some(hours) = facts.hours_per_week {
        let unit = if (hours - 1.0).abs() < f64::EPSILON { "Stunde" } else { "Stunden" };
        sentences.push(format!(
            "Während des Semesters fielen rund {} {unit} pro Woche an.",
            fmt_number(hours)
        ));
    }
    if !facts.strategies.is_empty() {
        sentences.push(format!("Bewährt haben sich {}.", texts::join_german(&facts.strategies)));
    }
    if !facts.materials.is_empty() {
        sentences.push(format!(
            "Hilfreiche Materialien waren {}.",
            texts::join_german(&facts.materials)
        ));
    }
    if !facts.pitfalls.is_empty() {
        sentences.push(format!("Vorsicht vor {}.", texts::join_german(&facts.pitfalls)));
    }
    if !facts.tips.is_empty() {
        sentences.push(format!("Ein Tipp aus dem Interview: {}.", texts::join_german(&facts.tips)));
    }
    if sentences.is_empty() {
        return "Zu dieser Teilleistung liegen noch keine belastbaren Erfahrungswerte vor."
            .to_owned();
    }
    sentences.join(" ")
}

fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{value:.1}")
    }
}
