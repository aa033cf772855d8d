//! Fact sets extracted from interview answers and their merge semantics.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// How a course is examined.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExamType {
    /// Written exam.
    #[serde(rename = "schriftlich")]
    Schriftlich,
    /// Oral exam.
    #[serde(rename = "mündlich")]
    Muendlich,
}

impl ExamType {
    /// Returns the German string representation used on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match *self {
            Self::Schriftlich => "schriftlich",
            Self::Muendlich => "mündlich",
        }
    }

    /// Parses a user- or oracle-supplied exam type string.
    ///
    /// Accepts the ASCII-folded spelling of "mündlich" as well.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "schriftlich" => Some(Self::Schriftlich),
            "mündlich" | "muendlich" => Some(Self::Muendlich),
            _ => None,
        }
    }
}

/// Typed facts about one course, collected within one session.
///
/// Scalar fields are `None` until an answer provides them; list fields keep
/// first-insertion order and never contain duplicates (enforced by
/// [`FactSet::merged`] and [`FactSet::sanitize`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FactSet {
    /// Exam form, if mentioned.
    #[serde(default)]
    pub exam_type: Option<ExamType>,
    /// Preparation time in weeks.
    #[serde(default)]
    pub prep_weeks: Option<f64>,
    /// Weekly workload in hours during the semester.
    #[serde(default)]
    pub hours_per_week: Option<f64>,
    /// Perceived difficulty on a 1..=5 scale.
    #[serde(default)]
    pub difficulty_1_5: Option<u8>,
    /// Learning strategies that worked.
    #[serde(default)]
    pub strategies: Vec<String>,
    /// Useful materials (scripts, old exams, forums).
    #[serde(default)]
    pub materials: Vec<String>,
    /// Pitfalls to avoid.
    #[serde(default)]
    pub pitfalls: Vec<String>,
    /// Free-form tips.
    #[serde(default)]
    pub tips: Vec<String>,
}

impl FactSet {
    /// Returns true when no fact has been collected yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exam_type.is_none()
            && self.prep_weeks.is_none()
            && self.hours_per_week.is_none()
            && self.difficulty_1_5.is_none()
            && self.strategies.is_empty()
            && self.materials.is_empty()
            && self.pitfalls.is_empty()
            && self.tips.is_empty()
    }

    /// Merges `newer` into `self` and returns the result.
    ///
    /// # Merge rules
    /// - **Scalars**: the newer value wins when non-null, else the existing
    ///   value is kept (right-biased last-non-null).
    /// - **Lists**: deduplicated union preserving first-seen order.
    #[must_use]
    pub fn merged(&self, newer: &Self) -> Self {
        Self {
            exam_type: newer.exam_type.or(self.exam_type),
            prep_weeks: newer.prep_weeks.or(self.prep_weeks),
            hours_per_week: newer.hours_per_week.or(self.hours_per_week),
            difficulty_1_5: newer.difficulty_1_5.or(self.difficulty_1_5),
            strategies: merge_lists(&self.strategies, &newer.strategies),
            materials: merge_lists(&self.materials, &newer.materials),
            pitfalls: merge_lists(&self.pitfalls, &newer.pitfalls),
            tips: merge_lists(&self.tips, &newer.tips),
        }
    }

    /// Clamps every field into its documented range.
    ///
    /// Non-finite numbers become `None`, a difficulty outside 1..=5 becomes
    /// `None`, list entries are trimmed, emptied entries dropped, and
    /// duplicates removed. Idempotent.
    pub fn sanitize(&mut self) {
        self.prep_weeks = self.prep_weeks.filter(|v| v.is_finite());
        self.hours_per_week = self.hours_per_week.filter(|v| v.is_finite());
        self.difficulty_1_5 = self.difficulty_1_5.filter(|d| (1..=5).contains(d));
        for list in [
            &mut self.strategies,
            &mut self.materials,
            &mut self.pitfalls,
            &mut self.tips,
        ] {
            for entry in list.iter_mut() {
                *entry = entry.trim().to_owned();
            }
            list.retain(|entry| !entry.is_empty());
            dedup_keep_first(list);
        }
    }

    /// Counts how many signals this fact set carries: one per populated
    /// scalar, one per non-empty list. Used by the least-known tie-breaker.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        let scalars = [
            self.exam_type.is_some(),
            self.prep_weeks.is_some(),
            self.hours_per_week.is_some(),
            self.difficulty_1_5.is_some(),
        ];
        let lists = [
            !self.strategies.is_empty(),
            !self.materials.is_empty(),
            !self.pitfalls.is_empty(),
            !self.tips.is_empty(),
        ];
        scalars.iter().chain(lists.iter()).filter(|b| **b).count()
    }
}

/// Drops repeated list entries in place, keeping the first occurrence of
/// each. List fields stay in insertion order after any merge or sanitize.
pub fn dedup_keep_first(items: &mut Vec<String>) {
    let mut observed: HashSet<String> = HashSet::with_capacity(items.len());
    items.retain(|entry| observed.insert(entry.clone()));
}

/// Ordered union of two list fields: everything from `existing`, then the
/// entries of `newer` that are not present yet.
fn merge_lists(existing: &[String], newer: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    merged.extend(newer.iter().cloned());
    dedup_keep_first(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(exam: Option<ExamType>, strategies: &[&str]) -> FactSet {
        FactSet {
            exam_type: exam,
            strategies: strategies.iter().map(|s| (*s).to_owned()).collect(),
            ..FactSet::default()
        }
    }

    #[test]
    fn merge_scalar_right_biased() {
        let a = facts(Some(ExamType::Schriftlich), &[]);
        let b = facts(Some(ExamType::Muendlich), &[]);
        assert_eq!(a.merged(&b).exam_type, Some(ExamType::Muendlich));
        assert_eq!(a.merged(&FactSet::default()).exam_type, Some(ExamType::Schriftlich));
    }

    #[test]
    fn merge_lists_ordered_union() {
        let a = facts(None, &["Altklausuren", "Skript"]);
        let b = facts(None, &["Skript", "Lerngruppe"]);
        assert_eq!(a.merged(&b).strategies, vec!["Altklausuren", "Skript", "Lerngruppe"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut items =
            vec!["a".to_owned(), "b".to_owned(), "a".to_owned(), "c".to_owned(), "b".to_owned()];
        dedup_keep_first(&mut items);
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn merge_lists_associative() {
        let a = facts(None, &["a", "b"]);
        let b = facts(None, &["b", "c"]);
        let c = facts(None, &["c", "d"]);
        assert_eq!(a.merged(&b).merged(&c), a.merged(&b.merged(&c)));
    }

    #[test]
    fn sanitize_clamps_ranges() {
        let mut f = FactSet {
            prep_weeks: Some(f64::NAN),
            hours_per_week: Some(f64::INFINITY),
            difficulty_1_5: Some(9),
            strategies: vec!["  x  ".to_owned(), String::new(), "x".to_owned()],
            ..FactSet::default()
        };
        f.sanitize();
        assert!(f.prep_weeks.is_none());
        assert!(f.hours_per_week.is_none());
        assert!(f.difficulty_1_5.is_none());
        assert_eq!(f.strategies, vec!["x"]);
        let again = f.clone();
        f.sanitize();
        assert_eq!(f, again);
    }

    #[test]
    fn signal_count_counts_scalars_and_lists() {
        let mut f = facts(Some(ExamType::Schriftlich), &["Altklausuren"]);
        assert_eq!(f.signal_count(), 2);
        f.difficulty_1_5 = Some(4);
        assert_eq!(f.signal_count(), 3);
        assert_eq!(FactSet::default().signal_count(), 0);
    }

    #[test]
    fn exam_type_parse_accepts_folded_umlaut() {
        assert_eq!(ExamType::parse("muendlich"), Some(ExamType::Muendlich));
        assert_eq!(ExamType::parse("Schriftlich"), Some(ExamType::Schriftlich));
        assert_eq!(ExamType::parse("Hausarbeit"), None);
    }
}
