//! Knowledge store: merge per-session facts into a course's
//! `new_knowledge` log and maintain the global JSON-LD and Turtle files.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write as _;

use chrono::Utc;
use kurswissen_core::{clean_title, Course, FactSet, KnowledgeEntry};
use serde_json::Value;

use crate::jsonld::build_jsonld;
use crate::{read_json_retry, Result, Storage, StorageError};

const TTL_HEADER: &str = "@prefix ex: <http://example.org/wi-ontology#> .\n@prefix schema: <http://schema.org/> .\n\n";

impl Storage {
    /// Merges extracted facts into the course's per-session knowledge entry
    /// and updates the global serializations.
    ///
    /// The course is located by id, by id embedded in the title, or by
    /// case-insensitive clean-title match. At most one entry exists per
    /// `(course, session)`: a repeat save merges into it in place. The
    /// first save appends one JSON-LD document and one Turtle block; a
    /// merge that changes the effective facts updates the JSON-LD document
    /// in place and appends a superseding Turtle block; an identical
    /// repeat save writes nothing. Idempotent.
    ///
    /// # Errors
    /// Returns `NotFound` when no catalog course matches, or an IO /
    /// serialization error from the file writes.
    pub fn save_new_knowledge(
        &self,
        course_id: &str,
        session_id: &str,
        title: &str,
        facts: &FactSet,
    ) -> Result<KnowledgeEntry> {
        let mut incoming = facts.clone();
        incoming.sanitize();

        let mut catalog = self.write_catalog();
        let index = locate_course(&catalog, course_id, title).ok_or_else(|| {
            StorageError::NotFound { entity: "course", id: course_id.to_owned() }
        })?;
        let course = &mut catalog[index];
        let display_title = clean_title(&course.title);
        let course_key = course.id.clone();

        let existing = course.new_knowledge.iter_mut().find(|e| e.session_id == session_id);
        let (entry, first_save, changed) = match existing {
            Some(prev) => {
                let merged = prev.facts.merged(&incoming);
                let changed = merged != prev.facts;
                if changed {
                    prev.facts = merged;
                    prev.timestamp = Utc::now();
                    prev.jsonld =
                        build_jsonld(&course_key, &display_title, session_id, &prev.facts);
                    prev.ttl =
                        turtle_block(&course_key, &display_title, session_id, &prev.facts);
                }
                (prev.clone(), false, changed)
            },
            None => {
                let entry = KnowledgeEntry {
                    session_id: session_id.to_owned(),
                    timestamp: Utc::now(),
                    jsonld: build_jsonld(&course_key, &display_title, session_id, &incoming),
                    ttl: turtle_block(&course_key, &display_title, session_id, &incoming),
                    facts: incoming,
                };
                course.new_knowledge.push(entry.clone());
                (entry, true, true)
            },
        };

        if changed {
            let serialized = serde_json::to_string_pretty(&*catalog)?;
            drop(catalog);
            fs::write(self.catalog_path(), serialized)?;
            self.upsert_global_jsonld(&entry.jsonld, first_save)?;
            self.append_turtle(&entry.ttl)?;
        }
        Ok(entry)
    }

    /// All knowledge entries a session contributed, with course id and
    /// cleaned title. Used by the evaluation aggregate.
    #[must_use]
    pub fn session_knowledge(&self, session_id: &str) -> Vec<(String, String, FactSet)> {
        let catalog = self.read_catalog();
        catalog
            .iter()
            .flat_map(|course| {
                course.new_knowledge.iter().filter(|e| e.session_id == session_id).map(|e| {
                    (course.id.clone(), clean_title(&course.title), e.facts.clone())
                })
            })
            .collect()
    }

    fn upsert_global_jsonld(&self, doc: &Value, first_save: bool) -> Result<()> {
        let path = self.jsonld_path();
        let mut docs: Vec<Value> = read_json_retry(&path)?.unwrap_or_default();
        let slot = docs.iter_mut().find(|d| {
            d.get("@id") == doc.get("@id") && d.get("ex:evidence") == doc.get("ex:evidence")
        });
        match slot {
            Some(existing) => *existing = doc.clone(),
            None => {
                if !first_save {
                    tracing::debug!("jsonld document missing on merge, appending");
                }
                docs.push(doc.clone());
            },
        }
        fs::write(path, serde_json::to_string_pretty(&docs)?)?;
        Ok(())
    }

    fn append_turtle(&self, block: &str) -> Result<()> {
        let path = self.ttl_path();
        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        if fresh {
            file.write_all(TTL_HEADER.as_bytes())?;
        }
        file.write_all(block.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Locates a course by id, by id embedded in the title, or by
/// case-insensitive clean-title match, in that order.
fn locate_course(catalog: &[Course], course_id: &str, title: &str) -> Option<usize> {
    if !course_id.is_empty() {
        if let Some(i) = catalog.iter().position(|c| c.id == course_id) {
            return Some(i);
        }
        if let Some(i) = catalog.iter().position(|c| c.title.contains(course_id)) {
            return Some(i);
        }
    }
    let wanted = clean_title(title).to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    catalog.iter().position(|c| clean_title(&c.title).to_lowercase() == wanted)
}

/// Renders one Turtle subject block for a `(course, session)` fact set.
///
/// String literals are escaped for `\` and `"`; whole numbers are written
/// without a fractional part.
#[must_use]
pub fn turtle_block(course_id: &str, name: &str, session_id: &str, facts: &FactSet) -> String {
    let mut out = String::new();
    let _ = write!(out, "ex:{course_id} a ex:Course ;");
    let _ = write!(out, "\n    schema:name {}", literal(name));
    if let Some(exam) = facts.exam_type {
        let _ = write!(out, " ;\n    ex:examType {}", literal(exam.as_str()));
    }
    if let Some(difficulty) = facts.difficulty_1_5 {
        let _ = write!(out, " ;\n    ex:difficulty {difficulty}");
    }
    if let Some(weeks) = facts.prep_weeks {
        let _ = write!(out, " ;\n    ex:prepWeeks {}", number(weeks));
    }
    if let Some(hours) = facts.hours_per_week {
        let _ = write!(out, " ;\n    ex:hoursPerWeek {}", number(hours));
    }
    for (predicate, list) in [
        ("ex:strategy", &facts.strategies),
        ("ex:material", &facts.materials),
        ("ex:pitfall", &facts.pitfalls),
        ("ex:tip", &facts.tips),
    ] {
        if !list.is_empty() {
            let objects: Vec<String> = list.iter().map(|s| literal(s)).collect();
            let _ = write!(out, " ;\n    {predicate} {}", objects.join(", "));
        }
    }
    let _ = write!(out, " ;\n    ex:evidence {} .\n", literal(session_id));
    out
}

fn literal(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use kurswissen_core::ExamType;
    use tempfile::tempdir;

    use super::*;

    fn course(id: &str, title: &str) -> Course {
        Course {
            id: id.to_owned(),
            title: title.to_owned(),
            text: String::new(),
            new_knowledge: Vec::new(),
        }
    }

    fn open_with_catalog() -> (Storage, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let courses = vec![
            course("T-WIWI-102737", "Statistik 1 [T-WIWI-102737]"),
            course("T-MATH-100275", "Mathematik 1 [T-MATH-100275]"),
        ];
        std::fs::write(
            dir.path().join("catalog.json"),
            serde_json::to_string(&courses).unwrap(),
        )
        .unwrap();
        (Storage::open(dir.path()).unwrap(), dir)
    }

    fn facts_a() -> FactSet {
        FactSet {
            exam_type: Some(ExamType::Schriftlich),
            strategies: vec!["Altklausuren".to_owned()],
            ..FactSet::default()
        }
    }

    #[test]
    fn first_save_appends_entry_and_global_docs() {
        let (storage, dir) = open_with_catalog();
        storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &facts_a()).unwrap();

        let entry = storage.entry("T-WIWI-102737").unwrap();
        assert_eq!(entry.new_knowledge.len(), 1);

        let docs: Vec<Value> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("knowledge.jsonld")).unwrap(),
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        let ttl = std::fs::read_to_string(dir.path().join("knowledge.ttl")).unwrap();
        assert!(ttl.starts_with("@prefix ex:"));
        assert_eq!(ttl.matches("ex:T-WIWI-102737 a ex:Course").count(), 1);
    }

    #[test]
    fn repeat_save_is_idempotent() {
        let (storage, dir) = open_with_catalog();
        let first =
            storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &facts_a()).unwrap();
        let second =
            storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &facts_a()).unwrap();
        assert_eq!(first.facts, second.facts);
        assert_eq!(first.timestamp, second.timestamp);

        let entry = storage.entry("T-WIWI-102737").unwrap();
        assert_eq!(entry.new_knowledge.len(), 1);

        let docs: Vec<Value> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("knowledge.jsonld")).unwrap(),
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        let ttl = std::fs::read_to_string(dir.path().join("knowledge.ttl")).unwrap();
        assert_eq!(ttl.matches("ex:evidence").count(), 1);
    }

    #[test]
    fn merge_updates_single_entry_in_place() {
        let (storage, dir) = open_with_catalog();
        storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &facts_a()).unwrap();
        let delta = FactSet {
            difficulty_1_5: Some(4),
            strategies: vec!["Lerngruppe".to_owned()],
            ..FactSet::default()
        };
        storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &delta).unwrap();

        let entry = storage.entry("T-WIWI-102737").unwrap();
        assert_eq!(entry.new_knowledge.len(), 1);
        let merged = &entry.new_knowledge[0].facts;
        assert_eq!(merged.exam_type, Some(ExamType::Schriftlich));
        assert_eq!(merged.difficulty_1_5, Some(4));
        assert_eq!(merged.strategies, vec!["Altklausuren", "Lerngruppe"]);

        // JSON-LD array still holds exactly one document for (course, session).
        let docs: Vec<Value> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("knowledge.jsonld")).unwrap(),
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["ex:difficulty"], 4);
    }

    #[test]
    fn separate_sessions_get_separate_entries() {
        let (storage, _dir) = open_with_catalog();
        storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &facts_a()).unwrap();
        storage.save_new_knowledge("T-WIWI-102737", "s2", "Statistik 1", &facts_a()).unwrap();
        let entry = storage.entry("T-WIWI-102737").unwrap();
        assert_eq!(entry.new_knowledge.len(), 2);
    }

    #[test]
    fn locate_by_title_and_embedded_id() {
        let (storage, _dir) = open_with_catalog();
        // clean-title match, no id
        storage.save_new_knowledge("", "s1", "statistik 1", &facts_a()).unwrap();
        assert_eq!(storage.entry("T-WIWI-102737").unwrap().new_knowledge.len(), 1);
        // unknown course
        let err = storage.save_new_knowledge("T-NOPE-1", "s1", "Nope", &facts_a());
        assert!(matches!(err, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn turtle_escapes_literals() {
        let facts = FactSet {
            tips: vec!["Sage \"nein\" zu Panik \\ Stress".to_owned()],
            ..FactSet::default()
        };
        let block = turtle_block("T-1", "X", "s1", &facts);
        assert!(block.contains(r#""Sage \"nein\" zu Panik \\ Stress""#));
        assert!(block.trim_end().ends_with("ex:evidence \"s1\" ."));
    }

    #[test]
    fn turtle_numbers_render_plain() {
        let facts = FactSet {
            prep_weeks: Some(3.0),
            hours_per_week: Some(4.5),
            ..FactSet::default()
        };
        let block = turtle_block("T-1", "X", "s1", &facts);
        assert!(block.contains("ex:prepWeeks 3 ;"));
        assert!(block.contains("ex:hoursPerWeek 4.5 ;"));
    }

    #[test]
    fn session_knowledge_filters_by_session() {
        let (storage, _dir) = open_with_catalog();
        storage.save_new_knowledge("T-WIWI-102737", "s1", "Statistik 1", &facts_a()).unwrap();
        storage.save_new_knowledge("T-MATH-100275", "s2", "Mathematik 1", &facts_a()).unwrap();
        let mine = storage.session_knowledge("s1");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].0, "T-WIWI-102737");
        assert_eq!(mine[0].1, "Statistik 1");
    }
}
