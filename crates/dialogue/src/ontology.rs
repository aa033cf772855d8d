//! Deterministic text signals: area ("Hauptfach") detection, direct course
//! id recognition, and the abort prescreen.
//!
//! These run before any oracle call so the dialogue keeps moving when the
//! oracle is degraded.

use std::sync::OnceLock;

use regex::Regex;

/// Subject areas of the study program with their common aliases.
const HAUPTFAECHER: &[(&str, &[&str])] = &[
    (
        "betriebswirtschaftslehre",
        &[
            "bwl",
            "management",
            "marketing",
            "controlling",
            "finanzierung",
            "finance",
            "rechnungswesen",
            "produktion",
            "wirtschaftsinformatik",
            "logistik",
        ],
    ),
    (
        "volkswirtschaftslehre",
        &["vwl", "ökonomie", "economics", "wirtschaftspolitik", "makroökonomie", "mikroökonomie"],
    ),
    (
        "informatik",
        &[
            "computer science",
            "programmierung",
            "software",
            "java",
            "ki",
            "künstliche intelligenz",
            "datenbanken",
        ],
    ),
    (
        "operations research",
        &["optimierung", "supply chain", "netzwerke", "nichtlineare optimierung"],
    ),
    (
        "ingenieurwissenschaften",
        &[
            "maschinenbau",
            "mechatronik",
            "elektrotechnik",
            "werkstoffkunde",
            "produktionstechnik",
        ],
    ),
    ("mathematik", &["mathe", "analysis", "lineare algebra", "differentialgleichungen"]),
    ("statistik", &["ökonometrie", "wahrscheinlichkeit", "regression"]),
    ("wahlpflichtbereich", &["wahlpflicht", "seminar", "teamprojekt", "recht", "soziologie"]),
];

/// Phrases that make the controller consult the abort classifier.
const ABORT_MARKERS: &[&str] = &[
    "abbrechen",
    "aufhören",
    "anderes thema",
    "anderes fach",
    "kein interesse",
    "keine lust",
    "genug davon",
    "nichts mehr dazu",
    "lass uns wechseln",
    "stopp",
];

fn course_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\bT-[A-Z][A-Z-]*-\d{5,6}\b").expect("course id regex is valid")
    })
}

/// Detects the subject area named in a user turn, if any.
#[must_use]
pub fn detect_area(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let words: Vec<&str> =
        lowered.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()).collect();
    for (canonical, aliases) in HAUPTFAECHER {
        if lowered.contains(canonical) {
            return Some((*canonical).to_owned());
        }
        for alias in *aliases {
            let hit = if alias.contains(' ') {
                lowered.contains(alias)
            } else {
                words.iter().any(|w| w == alias)
            };
            if hit {
                return Some((*canonical).to_owned());
            }
        }
    }
    None
}

/// Extracts a directly mentioned course id (`T-…`), bypassing the oracle.
#[must_use]
pub fn find_course_id(text: &str) -> Option<String> {
    course_id_regex().find(text).map(|m| m.as_str().to_owned())
}

/// Cheap prescreen deciding whether the abort classifier is worth a call.
#[must_use]
pub fn abort_prescreen(text: &str) -> bool {
    let lowered = text.to_lowercase();
    ABORT_MARKERS.iter().any(|marker| lowered.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_area_via_alias_word() {
        assert_eq!(detect_area("Ich mag Mathe sehr").as_deref(), Some("mathematik"));
        assert_eq!(detect_area("BWL liegt mir nicht").as_deref(), Some("betriebswirtschaftslehre"));
        assert_eq!(detect_area("supply chain war spannend").as_deref(), Some("operations research"));
        assert!(detect_area("Heute war ein schöner Tag").is_none());
    }

    #[test]
    fn alias_requires_word_boundary() {
        // "ki" must not fire inside another word
        assert!(detect_area("Der Lukas war dabei").is_none());
        assert_eq!(detect_area("KI hat mich begeistert").as_deref(), Some("informatik"));
    }

    #[test]
    fn finds_course_ids() {
        assert_eq!(
            find_course_id("Ich meine T-WIWI-102737, die war gut").as_deref(),
            Some("T-WIWI-102737")
        );
        assert!(find_course_id("T-x-1 ist keine ID").is_none());
    }

    #[test]
    fn abort_prescreen_matches_phrases() {
        assert!(abort_prescreen("Lass uns das Thema abbrechen"));
        assert!(abort_prescreen("dazu habe ich keine Lust mehr"));
        assert!(!abort_prescreen("Die Klausur war schwer"));
    }
}
