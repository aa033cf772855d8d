//! Fixed German texts: greeting, question pools, prompts, messages, labels.

use kurswissen_core::SessionState;
use rand::seq::SliceRandom;

/// Fixed multi-line greeting emitted idempotently by `interview.start`.
pub const GREETING: &str = "Hallo! Schön, dass du dir Zeit nimmst. Ich sammle Erfahrungswissen zu Teilleistungen im B.Sc. Wirtschaftsingenieurwesen – also das, was nicht im Modulhandbuch steht.\nWir sprechen über Prüfungen, die du bereits geschrieben hast: Prüfungsform, Aufwand, Schwierigkeit, Lernstrategien und Tipps.\nZum Einstieg: In welchem Semester bist du, und wie viel Prozent deines Studiums hast du ungefähr abgeschlossen?";

/// Phase names used for oracle prompts and trace records.
pub const PHASE_GENERAL: &str = "Allgemeine Fragen";
pub const PHASE_SEARCH: &str = "Teilleistungssuche";
pub const PHASE_DEPTH: &str = "Vertiefung";
pub const PHASE_WRAP_UP: &str = "Abschluss";
pub const PHASE_EVALUATION: &str = "Evaluation";
pub const PHASE_QA: &str = "QA";

/// Phase-1 pool: broad questions before a course is on the table.
pub const POOL_GENERAL: &[&str] = &[
    "Welche Teilleistungen haben dir bisher am meisten Spaß gemacht?",
    "Gab es eine Prüfung, die dich besonders überrascht hat – positiv oder negativ?",
    "In welchem Bereich deines Studiums fühlst du dich bisher am sichersten?",
    "Welche Klausurenphase war für dich bisher die anstrengendste, und warum?",
];

/// Phase-2 pool: identification questions.
pub const POOL_IDENTIFY: &[&str] = &[
    "Über welche Teilleistung möchtest du als Nächstes sprechen?",
    "Welche Prüfung hast du zuletzt geschrieben?",
    "Fällt dir eine Teilleistung ein, zu der du anderen Studierenden etwas mitgeben möchtest?",
];

/// Phase-2 rephrase when the user talks about future exams.
pub const POOL_IDENTIFY_PAST: &[&str] = &[
    "Das klingt nach einer Prüfung, die noch vor dir liegt – mich interessieren Teilleistungen, die du bereits geschrieben hast. Welche wäre das?",
    "Lass uns bei bereits abgelegten Prüfungen bleiben: Welche Teilleistung hast du schon geschrieben?",
];

/// Phase-3 pool: depth questions for one course.
pub const POOL_DEPTH: &[&str] = &[
    "Wie lief die Prüfung ab – schriftlich oder mündlich?",
    "Wie viele Wochen hast du dich gezielt auf die Prüfung vorbereitet?",
    "Wie viele Stunden pro Woche hast du während des Semesters dafür investiert?",
    "Wie schwierig fandest du die Teilleistung auf einer Skala von 1 bis 5?",
    "Welche Lernstrategie hat bei dir am besten funktioniert?",
    "Welche Materialien waren besonders hilfreich – Skript, Altklausuren, Foren?",
    "Gab es Stolperfallen, vor denen du andere warnen würdest?",
    "Welchen Tipp würdest du jemandem geben, der diese Prüfung noch vor sich hat?",
];

/// Phase-4 pool: transition back to course identification.
pub const POOL_WRAP_UP: &[&str] = &[
    "Danke, das war sehr hilfreich! Gibt es eine weitere Teilleistung, über die du sprechen möchtest?",
    "Das nehme ich so mit. Magst du noch zu einer anderen Prüfung etwas erzählen?",
];

/// Verbatim from the original backend: generic resend message.
pub const MSG_TECHNICAL_PROBLEM: &str =
    "Es gab ein technisches Problem bei der Auswertung. Bitte stelle deine letzte Frage erneut.";

/// Transient rate-limit message; the stage is not modified.
pub const MSG_RATE_LIMITED: &str =
    "Der Dienst ist gerade stark ausgelastet. Bitte versuche es in einem Moment noch einmal.";

/// Sticky reason stored in the session flags on quota exhaustion.
pub const QUOTA_REASON: &str = "Das Kontingent des Sprachmodells ist erschöpft.";

/// QA refusal, verbatim from the original backend.
pub const MSG_QA_UNKNOWN: &str = "Ich weiß es nicht.";

/// Acknowledgement appended to the transcript on evaluation submit.
pub const MSG_EVAL_THANKS: &str = "Danke für dein Feedback! Deine Bewertung wurde gespeichert.";

/// Answer text of `evaluation.start`.
pub const MSG_EVAL_INTRO: &str = "Danke für das Gespräch! Unten findest du eine kurze Zusammenfassung und das gesammelte Wissen. Bitte bewerte zum Abschluss noch das Interview.";

/// Abort acknowledgement prefixed to the next identification question.
pub const MSG_ABORT_ACK: &str = "Kein Problem, dann lassen wir das Thema. ";

/// Message shown on every turn while the oracle is disabled.
#[must_use]
pub fn llm_disabled_message(reason: &str) -> String {
    format!(
        "{reason} Das Interview kann gerade nicht fortgesetzt werden – bitte versuche es später mit einem Neustart erneut."
    )
}

/// The combined "did you mean X, and have you written it?" prompt.
#[must_use]
pub fn confirm_prompt(title: &str, instructor: Option<&str>) -> String {
    match instructor {
        Some(name) => format!(
            "Meintest du „{title}“ (bei {name})? Und hast du die Teilleistung schon geschrieben?"
        ),
        None => format!("Meintest du „{title}“? Und hast du die Teilleistung schon geschrieben?"),
    }
}

/// Pure yes/no reprompt for the written question.
#[must_use]
pub fn written_reprompt(title: &str) -> String {
    format!("Hast du „{title}“ bereits geschrieben? Bitte antworte kurz mit Ja oder Nein.")
}

/// Prefix for the first depth question of a freshly entered course.
#[must_use]
pub fn lets_talk_prefix(title: &str) -> String {
    format!("Lass uns über „{title}“ sprechen. ")
}

/// Numbered shortlist prompt.
#[must_use]
pub fn candidate_list_prompt(candidates: &[kurswissen_core::CandidateRef]) -> String {
    let mut out = String::from("Da bin ich nicht ganz sicher. Welche davon meinst du?\n");
    for c in candidates {
        out.push_str(&format!("{}. {}\n", c.idx, c.title));
    }
    out.push_str("Antworte gerne mit der Nummer – oder nenne einen anderen Titel.");
    out
}

/// Difficulty labels for 1..=5.
#[must_use]
pub const fn difficulty_label(value: u8) -> &'static str {
    match value {
        1 => "sehr leicht",
        2 => "leicht",
        3 => "mittel",
        4 => "anspruchsvoll",
        _ => "sehr anspruchsvoll",
    }
}

/// Joins a list in German natural style: `A`, `A und B`, `A, B und C`.
#[must_use]
pub fn join_german(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{} und {last}", init.join(", ")),
    }
}

/// Picks a pool question that is not in the asked log yet.
///
/// Preference order: the oracle's candidate (when fresh), a random unasked
/// pool element, a generated follow-up that is unique by construction.
#[must_use]
pub fn fresh_question(candidate: &str, pool: &[&str], state: &SessionState) -> String {
    let candidate = candidate.trim();
    if !candidate.is_empty() && !state.asked_log.iter().any(|q| q == candidate) {
        return candidate.to_owned();
    }
    let unasked: Vec<&&str> =
        pool.iter().filter(|q| !state.asked_log.iter().any(|a| a == **q)).collect();
    if let Some(q) = unasked.choose(&mut rand::thread_rng()) {
        return (**q).to_owned();
    }
    // Pool exhausted: the asked-log length makes the text unique.
    format!(
        "Gibt es sonst noch etwas, das du teilen möchtest? ({}. Nachfrage)",
        state.asked_log.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_german_styles() {
        let one = vec!["A".to_owned()];
        let two = vec!["A".to_owned(), "B".to_owned()];
        let three = vec!["A".to_owned(), "B".to_owned(), "C".to_owned()];
        assert_eq!(join_german(&one), "A");
        assert_eq!(join_german(&two), "A und B");
        assert_eq!(join_german(&three), "A, B und C");
        assert_eq!(join_german(&[]), "");
    }

    #[test]
    fn fresh_question_avoids_asked_log() {
        let mut state = SessionState::default();
        state.asked_log = POOL_GENERAL.iter().map(|q| (*q).to_owned()).collect();
        let q = fresh_question(POOL_GENERAL[0], POOL_GENERAL, &state);
        assert!(!state.asked_log.contains(&q));
    }

    #[test]
    fn fresh_question_prefers_new_oracle_candidate() {
        let state = SessionState::default();
        let q = fresh_question("Wie war Analysis?", POOL_DEPTH, &state);
        assert_eq!(q, "Wie war Analysis?");
    }

    #[test]
    fn fresh_question_substitutes_duplicates_from_pool() {
        let mut state = SessionState::default();
        state.asked_log.push(POOL_DEPTH[0].to_owned());
        let q = fresh_question(POOL_DEPTH[0], POOL_DEPTH, &state);
        assert_ne!(q, POOL_DEPTH[0]);
        assert!(POOL_DEPTH.contains(&q.as_str()));
    }

    #[test]
    fn confirm_prompt_mentions_title_and_instructor() {
        let q = confirm_prompt("Statistik 1", Some("Prof. Henze"));
        assert!(q.starts_with("Meintest du „Statistik 1“"));
        assert!(q.contains("Prof. Henze"));
        assert!(q.contains("schon geschrieben"));
    }

    #[test]
    fn difficulty_labels_cover_scale() {
        assert_eq!(difficulty_label(1), "sehr leicht");
        assert_eq!(difficulty_label(4), "anspruchsvoll");
        assert_eq!(difficulty_label(5), "sehr anspruchsvoll");
    }
}
