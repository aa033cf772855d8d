//! Classifier implementations: prompt formulation, wire parsing, clamps.

use async_trait::async_trait;
use kurswissen_core::{CandidateRef, ExamType, FactSet, Role, Turn};
use serde::Deserialize;

use crate::ai_types::Message;
use crate::client::OracleClient;
use crate::error::OracleError;
use crate::types::{
    CandidateDecision, ControlIntent, EntityScan, IntroFacts, OracleCtx, PhaseQuestion,
    ResolveCandidate, TemporalHint, TitleMatch, TitleWritten, TlResolution, WroteHint,
};
use crate::Oracle;

/// Transcript turns forwarded to entity detection.
const HISTORY_TAIL: usize = 8;

/// Shared persona line for the interview classifiers.
const INTERVIEWER: &str = "Du unterstützt ein Interview mit Studierenden des \
B.Sc.-Wirtschaftsingenieurwesens über bereits geprüfte Teilleistungen. \
Synonyme: Teilleistung ≈ Vorlesung/Kurs/Veranstaltung/Fach.";

#[async_trait]
impl Oracle for OracleClient {
    async fn intro_extract(
        &self,
        ctx: &OracleCtx,
        user_text: &str,
    ) -> Result<IntroFacts, OracleError> {
        let messages = vec![
            Message::system(format!(
                "{INTERVIEWER}\nExtrahiere Semester und Studienfortschritt aus der Antwort.\n\
                 Gib ein JSON-Objekt zurück: \
                 {{\"semester\": <Zahl 1-20 oder null>, \"progress_percent\": <Zahl 0-100 oder null>}}."
            )),
            Message::user(user_text.to_owned()),
        ];
        let wire: IntroWire = self.chat_parsed(ctx, "intro_extract", messages).await?;
        Ok(clamp_intro(&wire))
    }

    async fn pick_phase_question(
        &self,
        ctx: &OracleCtx,
        phase_name: &str,
        pool: &[&str],
        already_asked: &[String],
        hint: Option<&str>,
    ) -> Result<PhaseQuestion, OracleError> {
        let pool_text = bullet_list(pool.iter().copied());
        let asked_text = if already_asked.is_empty() {
            "(keine)".to_owned()
        } else {
            bullet_list(already_asked.iter().map(String::as_str))
        };
        let hint_text = hint.map_or(String::new(), |h| format!("\n\nHinweis zur Prüfung:\n{h}"));
        let messages = vec![
            Message::system(format!(
                "{INTERVIEWER}\nWähle aus dem Fragenpool genau eine Frage für die Phase \
                 \"{phase_name}\", die noch nicht gestellt wurde. Du darfst die Frage leicht an \
                 den Gesprächsfluss anpassen, aber ihren Kern nicht verändern.\n\
                 Gib ein JSON-Objekt zurück: {{\"question\": \"…\", \"rationale\": \"…\"}}."
            )),
            Message::user(format!(
                "Fragenpool:\n{pool_text}\n\nBereits gestellt:\n{asked_text}{hint_text}"
            )),
        ];
        let wire: QuestionWire = self.chat_parsed(ctx, "pick_phase_question", messages).await?;
        Ok(PhaseQuestion { question: wire.question.trim().to_owned(), rationale: wire.rationale })
    }

    async fn detect_entities(
        &self,
        ctx: &OracleCtx,
        user_text: &str,
        history: &[Turn],
        strict_current: bool,
    ) -> Result<EntityScan, OracleError> {
        let scope = if strict_current {
            "Werte NUR die aktuelle Nutzernachricht aus; der Verlauf dient allein dem Verständnis."
        } else {
            "Werte die aktuelle Nutzernachricht im Kontext des Verlaufs aus."
        };
        let messages = vec![
            Message::system(format!(
                "{INTERVIEWER}\n{scope}\nErkenne Bereich (Hauptfach), genannte Teilleistungen \
                 und zeitliche Hinweise.\nGib ein JSON-Objekt zurück:\n\
                 {{\"found_area\": <Hauptfach oder null>, \
                 \"found_tl_text\": <auffälligste Teilleistungs-Nennung oder null>, \
                 \"found_tl_list\": [<alle Nennungen in Reihenfolge>], \
                 \"mentions_thesis\": <bool>, \"thesis_topic\": <Thema oder null>, \
                 \"temporal_hint\": \"past\"|\"future\"|\"mixed\"|\"unknown\", \
                 \"wrote_prob\": <0.0-1.0 oder null>, \
                 \"wrote_hint\": \"high\"|\"medium\"|\"low\"|null}}\n\
                 wrote_prob schätzt, ob die genannte Teilleistung bereits geschrieben wurde \
                 (Vergangenheitsform, \"bestanden\", \"Klausur geschrieben\" → hoch)."
            )),
            Message::user(format!(
                "Verlauf:\n{}\n\nAktuelle Nachricht:\n{user_text}",
                format_history(history)
            )),
        ];
        let wire: EntityWire = self.chat_parsed(ctx, "detect_entities", messages).await?;
        Ok(clamp_entities(wire))
    }

    async fn control_intent(
        &self,
        ctx: &OracleCtx,
        user_text: &str,
    ) -> Result<ControlIntent, OracleError> {
        let messages = vec![
            Message::system(
                "Entscheide, ob die Nutzernachricht das aktuelle Interviewthema abbrechen \
                 möchte (Themenwechsel, \"kein Interesse\", \"anderes Fach\") oder fortfahren \
                 will.\nGib ein JSON-Objekt zurück: {\"intent\": \"abort\"|\"continue\"}."
                    .to_owned(),
            ),
            Message::user(user_text.to_owned()),
        ];
        let wire: IntentWire = self.chat_parsed(ctx, "control_intent", messages).await?;
        Ok(if wire.intent.eq_ignore_ascii_case("abort") {
            ControlIntent::Abort
        } else {
            ControlIntent::Continue
        })
    }

    async fn written(
        &self,
        ctx: &OracleCtx,
        title: &str,
        reply: &str,
    ) -> Result<Option<bool>, OracleError> {
        let messages = vec![
            Message::system(format!(
                "Der Studierende wurde gefragt, ob er/sie die Teilleistung \"{title}\" bereits \
                 geschrieben hat.\nGib ein JSON-Objekt zurück: \
                 {{\"wrote\": true|false|null}} (null wenn die Antwort es offen lässt)."
            )),
            Message::user(reply.to_owned()),
        ];
        let wire: WrittenWire = self.chat_parsed(ctx, "written", messages).await?;
        Ok(wire.wrote)
    }

    async fn combined_title_written(
        &self,
        ctx: &OracleCtx,
        title: &str,
        reply: &str,
    ) -> Result<TitleWritten, OracleError> {
        let messages = vec![
            Message::system(format!(
                "Der Studierende wurde gefragt: \"Meintest du „{title}“, und hast du sie schon \
                 geschrieben?\" Werte die Antwort aus.\nGib ein JSON-Objekt zurück: \
                 {{\"title_match\": \"yes\"|\"no\"|\"unclear\", \"wrote\": true|false|null}}."
            )),
            Message::user(reply.to_owned()),
        ];
        let wire: TitleWrittenWire =
            self.chat_parsed(ctx, "combined_title_written", messages).await?;
        Ok(clamp_title_written(&wire))
    }

    async fn resolve_tl(
        &self,
        ctx: &OracleCtx,
        mention: &str,
        candidates: &[ResolveCandidate],
    ) -> Result<TlResolution, OracleError> {
        let listing = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {} ({}, Score {:.2})", i + 1, c.title, c.id, c.score))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = vec![
            Message::system(
                "Ordne die Nutzer-Nennung einer Teilleistung aus der Kandidatenliste zu.\n\
                 Gib ein JSON-Objekt zurück: {\"match_id\": <ID oder null>, \
                 \"match_title\": <Titel oder null>, \"confidence\": <0.0-1.0>, \
                 \"need_clarify\": <bool>, \"clarify_question\": <Rückfrage oder null>}.\n\
                 Wähle match_id nur aus der Liste; setze need_clarify, wenn mehrere Kandidaten \
                 ähnlich plausibel sind."
                    .to_owned(),
            ),
            Message::user(format!("Nennung: {mention}\n\nKandidaten:\n{listing}")),
        ];
        let wire: ResolutionWire = self.chat_parsed(ctx, "resolve_tl", messages).await?;
        Ok(clamp_resolution(wire, candidates))
    }

    async fn pick_candidate_from_reply(
        &self,
        ctx: &OracleCtx,
        candidates: &[CandidateRef],
        reply: &str,
    ) -> Result<CandidateDecision, OracleError> {
        let listing = candidates
            .iter()
            .map(|c| format!("{}. {}", c.idx, c.title))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = vec![
            Message::system(
                "Dem Studierenden wurde eine nummerierte Auswahl von Teilleistungen angeboten. \
                 Werte die Antwort aus.\nGib ein JSON-Objekt zurück: \
                 {\"decision\": \"pick\"|\"none\"|\"free\", \"idx\": <Nummer bei pick>, \
                 \"title\": <freier Titel bei free>}."
                    .to_owned(),
            ),
            Message::user(format!("Auswahl:\n{listing}\n\nAntwort:\n{reply}")),
        ];
        let wire: PickWire = self.chat_parsed(ctx, "pick_candidate_from_reply", messages).await?;
        Ok(clamp_pick(&wire, candidates.len()))
    }

    async fn extract_facts(
        &self,
        ctx: &OracleCtx,
        title: &str,
        answer: &str,
        prev_facts: &FactSet,
    ) -> Result<FactSet, OracleError> {
        let prev = serde_json::to_string(prev_facts).unwrap_or_else(|_| "{}".to_owned());
        let messages = vec![
            Message::system(format!(
                "{INTERVIEWER}\nExtrahiere NEUE Fakten über die Teilleistung \"{title}\" aus der \
                 Antwort. Bereits bekannte Fakten nicht wiederholen.\nGib ein JSON-Objekt \
                 zurück:\n{{\"exam_type\": \"schriftlich\"|\"mündlich\"|null, \
                 \"prep_weeks\": <Zahl oder null>, \"hours_per_week\": <Zahl oder null>, \
                 \"difficulty_1_5\": <1-5 oder null>, \"strategies\": [..], \
                 \"materials\": [..], \"pitfalls\": [..], \"tips\": [..]}}\n\
                 Leere Listen statt null für Listenfelder."
            )),
            Message::user(format!("Bekannte Fakten: {prev}\n\nAntwort:\n{answer}")),
        ];
        let wire: FactsWire = self.chat_parsed(ctx, "extract_facts", messages).await?;
        Ok(clamp_facts(wire))
    }

    async fn summarize_transcript(
        &self,
        ctx: &OracleCtx,
        turns: &[Turn],
    ) -> Result<String, OracleError> {
        let messages = vec![
            Message::system(
                "Fasse das Interview in 3 bis 6 Sätzen auf Deutsch zusammen: welche \
                 Teilleistungen besprochen wurden und welche Erfahrungen der Studierende \
                 geteilt hat. Keine Aufzählungen, nur Fließtext."
                    .to_owned(),
            ),
            Message::user(format_transcript(turns)),
        ];
        let summary = self.chat(ctx, "summarize_transcript", messages, false).await?;
        Ok(summary.trim().to_owned())
    }

    async fn answer_question(
        &self,
        ctx: &OracleCtx,
        question: &str,
        context: &str,
    ) -> Result<String, OracleError> {
        let messages = vec![
            Message::system(
                "Du bist Studienberater des B.Sc.-Wirtschaftsingenieurwesens. Zitiere nur \
                 Fakten aus dem Kontext. Wenn nichts belegbar ist, antworte exakt: \
                 'Ich weiß es nicht.'"
                    .to_owned(),
            ),
            Message::user(format!("Kontext:\n{context}\n\nFrage: {question}")),
        ];
        let answer = self.chat(ctx, "answer_question", messages, false).await?;
        Ok(answer.trim().to_owned())
    }
}

// ---------------------------------------------------------------------------
// Wire objects and clamps
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IntroWire {
    #[serde(default)]
    semester: Option<f64>,
    #[serde(default)]
    progress_percent: Option<f64>,
}

fn clamp_intro(wire: &IntroWire) -> IntroFacts {
    IntroFacts {
        semester: clamp_range(wire.semester, 1.0, 20.0),
        progress_percent: clamp_range(wire.progress_percent, 0.0, 100.0),
    }
}

/// Rounds into `Option<u8>`, out-of-range or non-finite becomes `None`.
fn clamp_range(value: Option<f64>, min: f64, max: f64) -> Option<u8> {
    let v = value.filter(|v| v.is_finite())?.round();
    (min..=max).contains(&v).then(|| v as u8)
}

#[derive(Deserialize)]
struct QuestionWire {
    #[serde(default)]
    question: String,
    #[serde(default)]
    rationale: String,
}

#[derive(Deserialize)]
struct EntityWire {
    #[serde(default)]
    found_area: Option<String>,
    #[serde(default)]
    found_tl_text: Option<String>,
    #[serde(default)]
    found_tl_list: Vec<String>,
    #[serde(default)]
    mentions_thesis: bool,
    #[serde(default)]
    thesis_topic: Option<String>,
    #[serde(default)]
    temporal_hint: Option<String>,
    #[serde(default)]
    wrote_prob: Option<f64>,
    #[serde(default)]
    wrote_hint: Option<String>,
}

fn clamp_entities(wire: EntityWire) -> EntityScan {
    let temporal_hint = match wire.temporal_hint.as_deref().map(str::to_lowercase).as_deref() {
        Some("past") => TemporalHint::Past,
        Some("future") => TemporalHint::Future,
        Some("mixed") => TemporalHint::Mixed,
        _ => TemporalHint::Unknown,
    };
    let wrote_hint = match wire.wrote_hint.as_deref().map(str::to_lowercase).as_deref() {
        Some("high") => Some(WroteHint::High),
        Some("medium") => Some(WroteHint::Medium),
        Some("low") => Some(WroteHint::Low),
        _ => None,
    };
    let mut found_tl_list: Vec<String> =
        wire.found_tl_list.into_iter().map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect();
    let found_tl_text = wire
        .found_tl_text
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .or_else(|| found_tl_list.first().cloned());
    if let Some(text) = &found_tl_text {
        if !found_tl_list.iter().any(|t| t == text) {
            found_tl_list.insert(0, text.clone());
        }
    }
    EntityScan {
        found_area: wire.found_area.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()),
        found_tl_text,
        found_tl_list,
        mentions_thesis: wire.mentions_thesis,
        thesis_topic: wire.thesis_topic.filter(|s| !s.trim().is_empty()),
        temporal_hint,
        wrote_prob: wire.wrote_prob.filter(|p| p.is_finite()).map(|p| p.clamp(0.0, 1.0)),
        wrote_hint,
    }
}

#[derive(Deserialize)]
struct IntentWire {
    #[serde(default)]
    intent: String,
}

#[derive(Deserialize)]
struct WrittenWire {
    #[serde(default)]
    wrote: Option<bool>,
}

#[derive(Deserialize)]
struct TitleWrittenWire {
    #[serde(default)]
    title_match: String,
    #[serde(default)]
    wrote: Option<bool>,
}

fn clamp_title_written(wire: &TitleWrittenWire) -> TitleWritten {
    let title_match = match wire.title_match.to_lowercase().as_str() {
        "yes" | "ja" => TitleMatch::Yes,
        "no" | "nein" => TitleMatch::No,
        _ => TitleMatch::Unclear,
    };
    TitleWritten { title_match, wrote: wire.wrote }
}

#[derive(Deserialize)]
struct ResolutionWire {
    #[serde(default)]
    match_id: Option<String>,
    #[serde(default)]
    match_title: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    need_clarify: bool,
    #[serde(default)]
    clarify_question: Option<String>,
}

fn clamp_resolution(wire: ResolutionWire, candidates: &[ResolveCandidate]) -> TlResolution {
    let confidence =
        wire.confidence.filter(|c| c.is_finite()).map_or(0.0, |c| c.clamp(0.0, 1.0));
    // Only ids from the offered list are valid matches.
    let matched = wire
        .match_id
        .and_then(|id| candidates.iter().find(|c| c.id == id));
    match matched {
        Some(candidate) => TlResolution {
            match_id: Some(candidate.id.clone()),
            match_title: Some(
                wire.match_title.unwrap_or_else(|| candidate.title.clone()),
            ),
            confidence,
            need_clarify: wire.need_clarify,
            clarify_question: wire.clarify_question,
        },
        None => TlResolution {
            match_id: None,
            match_title: None,
            confidence: 0.0,
            need_clarify: wire.need_clarify,
            clarify_question: wire.clarify_question,
        },
    }
}

#[derive(Deserialize)]
struct PickWire {
    #[serde(default)]
    decision: String,
    #[serde(default)]
    idx: Option<f64>,
    #[serde(default)]
    title: Option<String>,
}

fn clamp_pick(wire: &PickWire, len: usize) -> CandidateDecision {
    match wire.decision.to_lowercase().as_str() {
        "pick" => {
            let idx = wire
                .idx
                .filter(|i| i.is_finite())
                .map(|i| i.round() as usize)
                .filter(|i| (1..=len).contains(i));
            idx.map_or(CandidateDecision::None, CandidateDecision::Pick)
        },
        "free" => wire
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map_or(CandidateDecision::None, |t| CandidateDecision::Free(t.to_owned())),
        _ => CandidateDecision::None,
    }
}

#[derive(Deserialize)]
struct FactsWire {
    #[serde(default)]
    exam_type: Option<String>,
    #[serde(default)]
    prep_weeks: Option<f64>,
    #[serde(default)]
    hours_per_week: Option<f64>,
    #[serde(default)]
    difficulty_1_5: Option<f64>,
    #[serde(default)]
    strategies: Vec<String>,
    #[serde(default)]
    materials: Vec<String>,
    #[serde(default)]
    pitfalls: Vec<String>,
    #[serde(default)]
    tips: Vec<String>,
}

fn clamp_facts(wire: FactsWire) -> FactSet {
    let mut facts = FactSet {
        exam_type: wire.exam_type.as_deref().and_then(ExamType::parse),
        prep_weeks: wire.prep_weeks,
        hours_per_week: wire.hours_per_week,
        difficulty_1_5: clamp_range(wire.difficulty_1_5, 1.0, 5.0),
        strategies: wire.strategies,
        materials: wire.materials,
        pitfalls: wire.pitfalls,
        tips: wire.tips,
    };
    facts.sanitize();
    facts
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.map(|q| format!("- {q}")).collect::<Vec<_>>().join("\n")
}

fn format_history(turns: &[Turn]) -> String {
    let tail = turns.iter().rev().take(HISTORY_TAIL).rev();
    let lines: Vec<String> = tail
        .map(|t| {
            let who = match t.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
                Role::System => "System",
            };
            format!("{who}: {}", t.content)
        })
        .collect();
    if lines.is_empty() {
        "(leer)".to_owned()
    } else {
        lines.join("\n")
    }
}

fn format_transcript(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            let who = match t.role {
                Role::User => "Studierende:r",
                Role::Assistant => "Interviewer",
                Role::System => "System",
            };
            format!("{who}: {}", t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intro_clamps_out_of_range_to_null() {
        let wire = IntroWire { semester: Some(42.0), progress_percent: Some(70.4) };
        let facts = clamp_intro(&wire);
        assert_eq!(facts.semester, None);
        assert_eq!(facts.progress_percent, Some(70));
    }

    #[test]
    fn entities_clamp_wrote_prob_and_fold_hint() {
        let wire: EntityWire = serde_json::from_value(serde_json::json!({
            "found_tl_text": " Mathe 1 ",
            "temporal_hint": "FUTURE",
            "wrote_prob": 1.7,
            "wrote_hint": "High"
        }))
        .unwrap();
        let scan = clamp_entities(wire);
        assert_eq!(scan.found_tl_text.as_deref(), Some("Mathe 1"));
        assert_eq!(scan.found_tl_list, vec!["Mathe 1"]);
        assert_eq!(scan.temporal_hint, TemporalHint::Future);
        assert_eq!(scan.wrote_prob, Some(1.0));
        assert_eq!(scan.wrote_hint, Some(WroteHint::High));
    }

    #[test]
    fn entities_promote_first_list_item() {
        let wire: EntityWire = serde_json::from_value(serde_json::json!({
            "found_tl_list": ["Statistik 1", "Mathe 2"]
        }))
        .unwrap();
        let scan = clamp_entities(wire);
        assert_eq!(scan.found_tl_text.as_deref(), Some("Statistik 1"));
        assert_eq!(scan.found_tl_list.len(), 2);
    }

    #[test]
    fn resolution_rejects_unknown_ids() {
        let candidates = vec![ResolveCandidate {
            id: "T-1".to_owned(),
            title: "Statistik 1".to_owned(),
            score: 0.9,
        }];
        let wire = ResolutionWire {
            match_id: Some("T-INVENTED".to_owned()),
            match_title: Some("Statistik 1".to_owned()),
            confidence: Some(0.95),
            need_clarify: false,
            clarify_question: None,
        };
        let resolved = clamp_resolution(wire, &candidates);
        assert!(resolved.match_id.is_none());
        assert!(resolved.confidence < f64::EPSILON);
    }

    #[test]
    fn pick_validates_index_bounds() {
        let wire = PickWire { decision: "pick".to_owned(), idx: Some(4.0), title: None };
        assert_eq!(clamp_pick(&wire, 3), CandidateDecision::None);
        let wire = PickWire { decision: "pick".to_owned(), idx: Some(2.0), title: None };
        assert_eq!(clamp_pick(&wire, 3), CandidateDecision::Pick(2));
    }

    #[test]
    fn facts_clamp_difficulty_and_exam_type() {
        let wire: FactsWire = serde_json::from_value(serde_json::json!({
            "exam_type": "muendlich",
            "difficulty_1_5": 9,
            "prep_weeks": 3.5,
            "strategies": ["Altklausuren", "Altklausuren", ""]
        }))
        .unwrap();
        let facts = clamp_facts(wire);
        assert_eq!(facts.exam_type, Some(ExamType::Muendlich));
        assert_eq!(facts.difficulty_1_5, None);
        assert_eq!(facts.prep_weeks, Some(3.5));
        assert_eq!(facts.strategies, vec!["Altklausuren"]);
    }
}
