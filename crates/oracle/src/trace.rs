//! Per-session JSONL trace of every oracle call.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::ai_types::Message;

/// One trace record, appended per call regardless of outcome.
#[derive(Debug, Serialize)]
pub struct TraceRecord<'a> {
    pub ts: DateTime<Utc>,
    pub session_id: &'a str,
    pub op: &'a str,
    pub phase: &'a str,
    pub messages: &'a [Message],
    pub output: Value,
}

/// Appends a record to `<dir>/<session_id>.jsonl`. Trace failures are
/// logged and swallowed; they must never fail the dialogue turn.
pub(crate) fn append(dir: &Path, record: &TraceRecord<'_>) {
    let path = dir.join(format!("{}.jsonl", record.session_id));
    let line = match serde_json::to_string(record) {
        Ok(line) => line,
        Err(e) => {
            tracing::warn!(error = %e, "trace record not serializable");
            return;
        },
    };
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| writeln!(file, "{line}"));
    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "trace append failed");
    }
}
