//! Append-only evaluation submissions log.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, Storage};

/// One submitted evaluation form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub ts: DateTime<Utc>,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub ratings: HashMap<String, f64>,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub corrections: String,
}

impl Storage {
    /// Appends one JSON-lines record to `evaluations.jsonl`.
    ///
    /// # Errors
    /// Returns an IO or serialization error from the append.
    pub fn append_evaluation(&self, record: &EvaluationRecord) -> Result<()> {
        let mut file =
            OpenOptions::new().create(true).append(true).open(self.evaluations_path())?;
        let line = serde_json::to_string(record)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}
