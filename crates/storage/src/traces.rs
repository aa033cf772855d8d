//! Read access to the per-session oracle trace files.

use std::fs;

use crate::{Result, Storage, StorageError};

impl Storage {
    /// Raw JSONL content of one session's oracle trace.
    ///
    /// # Errors
    /// Returns `NotFound` for an unknown session or a session id that is
    /// not a plain file name (path traversal guard).
    pub fn read_trace(&self, session_id: &str) -> Result<String> {
        if !is_safe_id(session_id) {
            return Err(StorageError::NotFound { entity: "trace", id: session_id.to_owned() });
        }
        let path = self.traces_dir().join(format!("{session_id}.jsonl"));
        if !path.exists() {
            return Err(StorageError::NotFound { entity: "trace", id: session_id.to_owned() });
        }
        Ok(fs::read_to_string(path)?)
    }
}

/// Session ids may only contain characters that cannot escape the traces
/// directory.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !id.contains("..")
}
