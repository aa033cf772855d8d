//! Catalog course entries and their per-session knowledge log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::facts::FactSet;

/// One curated course entry ("Teilleistung") from the catalog.
///
/// Immutable at runtime except for the append/merge `new_knowledge` log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Stable id of the form `T-…`.
    pub id: String,
    /// Display title; may carry the bracketed id suffix.
    pub title: String,
    /// Free-form descriptor text from the module handbook.
    #[serde(default)]
    pub text: String,
    /// Per-session fact log, at most one entry per session id.
    #[serde(default)]
    pub new_knowledge: Vec<KnowledgeEntry>,
}

/// Facts one session contributed to a course, with both serializations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Session the facts came from (evidence pointer, id string only).
    pub session_id: String,
    /// Last write time of this entry.
    pub timestamp: DateTime<Utc>,
    /// Merged facts for this (course, session).
    pub facts: FactSet,
    /// Embedded JSON-LD document recomputed from `facts`.
    pub jsonld: Value,
    /// Embedded Turtle fragment recomputed from `facts`.
    pub ttl: String,
}

/// Strips a trailing bracketed id from a display title.
///
/// `"Statistik 1 [T-WIWI-102737]"` becomes `"Statistik 1"`. Titles without
/// a bracketed `T-…` suffix are returned trimmed but otherwise unchanged.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let trimmed = title.trim();
    for (open, close) in [('[', ']'), ('(', ')')] {
        if let Some(start) = trimmed.rfind(open) {
            let inner = &trimmed[start + open.len_utf8()..];
            if trimmed.ends_with(close) && inner.trim_start().starts_with("T-") {
                return trimmed[..start].trim_end().to_owned();
            }
        }
    }
    trimmed.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_strips_bracketed_id() {
        assert_eq!(clean_title("Statistik 1 [T-WIWI-102737]"), "Statistik 1");
        assert_eq!(clean_title("Mathe 1 (T-MATH-100275)"), "Mathe 1");
    }

    #[test]
    fn clean_title_keeps_plain_titles() {
        assert_eq!(clean_title("  Operations Research  "), "Operations Research");
        assert_eq!(clean_title("Logistik (Vertiefung)"), "Logistik (Vertiefung)");
    }
}
