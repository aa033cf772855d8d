//! JSON-LD rendering of a per-session fact set.

use kurswissen_core::FactSet;
use serde_json::{json, Map, Value};

/// Builds the JSON-LD document for one `(course, session)` fact set.
///
/// Context and predicate vocabulary are fixed: `ex:` for the study
/// ontology, `schema:` for schema.org. Empty facts are omitted rather
/// than serialized as null. The `ex:evidence` value is the session id
/// string only; knowledge never owns session objects.
#[must_use]
pub fn build_jsonld(course_id: &str, name: &str, session_id: &str, facts: &FactSet) -> Value {
    let mut doc = Map::new();
    doc.insert(
        "@context".to_owned(),
        json!({
            "ex": "http://example.org/wi-ontology#",
            "schema": "http://schema.org/",
        }),
    );
    doc.insert("@id".to_owned(), json!(format!("ex:{course_id}")));
    doc.insert("@type".to_owned(), json!("ex:Course"));
    doc.insert("schema:name".to_owned(), json!(name));

    if let Some(exam) = facts.exam_type {
        doc.insert("ex:examType".to_owned(), json!(exam.as_str()));
    }
    if let Some(difficulty) = facts.difficulty_1_5 {
        doc.insert("ex:difficulty".to_owned(), json!(difficulty));
    }
    if let Some(weeks) = facts.prep_weeks {
        doc.insert("ex:prepWeeks".to_owned(), json!(weeks));
    }
    if let Some(hours) = facts.hours_per_week {
        doc.insert("ex:hoursPerWeek".to_owned(), json!(hours));
    }
    for (predicate, list) in [
        ("ex:strategy", &facts.strategies),
        ("ex:material", &facts.materials),
        ("ex:pitfall", &facts.pitfalls),
        ("ex:tip", &facts.tips),
    ] {
        if !list.is_empty() {
            doc.insert(predicate.to_owned(), json!(list));
        }
    }
    doc.insert("ex:evidence".to_owned(), json!(session_id));
    Value::Object(doc)
}
