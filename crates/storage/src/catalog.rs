//! Catalog index: fuzzy candidate search and pure lookups over the loaded
//! course list.

use kurswissen_core::constants::{FAMILIAR_ENTRY_CAP, FAMILIAR_TEXT_LEN};
use kurswissen_core::{clean_title, Course};
use serde::Serialize;

use crate::score::fuzzy_score;
use crate::Storage;

/// One fuzzy-search hit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CandidateHit {
    pub id: String,
    pub title: String,
    pub score: f64,
}

impl Storage {
    /// Top-`k` catalog candidates for a free-text course mention,
    /// sorted by descending blended fuzzy score.
    #[must_use]
    pub fn candidates(&self, query: &str, k: usize) -> Vec<CandidateHit> {
        let catalog = self.read_catalog();
        let mut hits: Vec<CandidateHit> = catalog
            .iter()
            .map(|course| CandidateHit {
                id: course.id.clone(),
                title: course.title.clone(),
                score: fuzzy_score(query, &clean_title(&course.title)),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        hits
    }

    /// Full course entry by id.
    #[must_use]
    pub fn entry(&self, id: &str) -> Option<Course> {
        self.read_catalog().iter().find(|c| c.id == id).cloned()
    }

    /// The "Erfolgskontrolle(n)" paragraph of a course descriptor, if any.
    /// Used as a hint for the depth-interview question picker.
    #[must_use]
    pub fn erfolgskontrolle_text(&self, id: &str) -> Option<String> {
        let catalog = self.read_catalog();
        let course = catalog.iter().find(|c| c.id == id)?;
        extract_erfolgskontrolle(&course.text)
    }

    /// The instructor named on the "Dozent:" line of a course descriptor.
    #[must_use]
    pub fn primary_instructor(&self, id: &str) -> Option<String> {
        let catalog = self.read_catalog();
        let course = catalog.iter().find(|c| c.id == id)?;
        extract_instructor(&course.text)
    }

    /// Familiarity of a course from prior sessions, for the least-known
    /// tie-breaker: fact signals summed over the `new_knowledge` log, plus
    /// a capped entry-count bonus, plus one for a long descriptor.
    #[must_use]
    pub fn familiarity_score(&self, id: &str) -> usize {
        let catalog = self.read_catalog();
        catalog.iter().find(|c| c.id == id).map_or(0, familiarity)
    }
}

pub(crate) fn familiarity(course: &Course) -> usize {
    let signals: usize = course.new_knowledge.iter().map(|e| e.facts.signal_count()).sum();
    let entries = course.new_knowledge.len().min(FAMILIAR_ENTRY_CAP);
    let documented = usize::from(course.text.len() > FAMILIAR_TEXT_LEN);
    signals + entries + documented
}

fn extract_erfolgskontrolle(text: &str) -> Option<String> {
    let start = text.find("Erfolgskontrolle")?;
    let tail = &text[start..];
    let end = tail.find("\n\n").unwrap_or(tail.len());
    let paragraph = tail[..end].trim();
    (!paragraph.is_empty()).then(|| paragraph.to_owned())
}

fn extract_instructor(text: &str) -> Option<String> {
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("Dozent:") {
            let name = rest.trim_start_matches("in:").trim();
            if !name.is_empty() {
                return Some(name.to_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use kurswissen_core::{FactSet, KnowledgeEntry};
    use tempfile::tempdir;

    use super::*;

    fn course(id: &str, title: &str, text: &str) -> Course {
        Course {
            id: id.to_owned(),
            title: title.to_owned(),
            text: text.to_owned(),
            new_knowledge: Vec::new(),
        }
    }

    fn storage_with(courses: Vec<Course>) -> (Storage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("catalog.json"),
            serde_json::to_string(&courses).unwrap(),
        )
        .unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        (storage, dir)
    }

    #[test]
    fn candidates_ranked_by_score() {
        let (storage, _dir) = storage_with(vec![
            course("T-WIWI-102737", "Statistik 1 [T-WIWI-102737]", ""),
            course("T-WIWI-102706", "Marketing Grundlagen [T-WIWI-102706]", ""),
            course("T-MATH-100275", "Mathematik 1 [T-MATH-100275]", ""),
        ]);
        let hits = storage.candidates("Statistik", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "T-WIWI-102737");
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn missing_catalog_yields_empty_index() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        assert!(storage.candidates("Statistik", 3).is_empty());
        assert!(storage.entry("T-X").is_none());
    }

    #[test]
    fn malformed_catalog_yields_empty_index() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("catalog.json"), "{not json").unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        assert!(storage.candidates("Statistik", 3).is_empty());
    }

    #[test]
    fn erfolgskontrolle_paragraph_extracted() {
        let text = "Inhalt\nGrundlagen der Statistik.\n\nErfolgskontrolle(n)\nDie Erfolgskontrolle erfolgt in Form einer schriftlichen Prüfung (90 min).\n\nVoraussetzungen\nKeine.";
        let (storage, _dir) = storage_with(vec![course("T-1", "Statistik 1", text)]);
        let para = storage.erfolgskontrolle_text("T-1").unwrap();
        assert!(para.starts_with("Erfolgskontrolle(n)"));
        assert!(para.contains("90 min"));
        assert!(!para.contains("Voraussetzungen"));
    }

    #[test]
    fn instructor_line_extracted() {
        let text = "Inhalt\n…\nDozent: Prof. Dr. Norbert Henze\nTurnus: Wintersemester";
        let (storage, _dir) = storage_with(vec![course("T-1", "Statistik 1", text)]);
        assert_eq!(storage.primary_instructor("T-1").as_deref(), Some("Prof. Dr. Norbert Henze"));
        assert!(storage.primary_instructor("T-missing").is_none());
    }

    #[test]
    fn familiarity_counts_signals_entries_and_descriptor() {
        let mut c = course("T-1", "Statistik 1", &"x".repeat(250));
        c.new_knowledge.push(KnowledgeEntry {
            session_id: "s1".to_owned(),
            timestamp: chrono::Utc::now(),
            facts: FactSet {
                difficulty_1_5: Some(4),
                strategies: vec!["Altklausuren".to_owned()],
                ..FactSet::default()
            },
            jsonld: serde_json::Value::Null,
            ttl: String::new(),
        });
        // 2 signals + min(2,1) entries + 1 long descriptor
        assert_eq!(familiarity(&c), 4);
    }
}
