//! Session store: in-memory map snapshotted to a single JSON file after
//! every handled turn, sanitized on load.

use std::collections::HashMap;
use std::fs;

use kurswissen_core::SessionState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{read_json_retry, Result, Storage};

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    sessions: HashMap<String, Value>,
}

impl Storage {
    /// Clone of one session's state.
    #[must_use]
    pub fn session(&self, session_id: &str) -> Option<SessionState> {
        self.lock_sessions().get(session_id).cloned()
    }

    /// Inserts or replaces a session and rewrites the snapshot file.
    ///
    /// # Errors
    /// Returns an IO or serialization error from the snapshot write; the
    /// in-memory state is updated regardless.
    pub fn upsert_session(&self, session_id: &str, state: SessionState) -> Result<()> {
        self.lock_sessions().insert(session_id.to_owned(), state);
        self.write_snapshot()
    }

    /// Removes a session. Returns whether it existed; the snapshot is
    /// rewritten only on an actual removal.
    ///
    /// # Errors
    /// Returns an IO or serialization error from the snapshot write.
    pub fn delete_session(&self, session_id: &str) -> Result<bool> {
        let removed = self.lock_sessions().remove(session_id).is_some();
        if removed {
            self.write_snapshot()?;
        }
        Ok(removed)
    }

    /// Clone of the whole session map (admin inspection).
    #[must_use]
    pub fn all_sessions(&self) -> HashMap<String, SessionState> {
        self.lock_sessions().clone()
    }

    /// Loads the snapshot file into memory. Sessions that fail to
    /// deserialize even leniently are dropped with a warning; every loaded
    /// session passes the sanitizer, making old snapshots forward-compatible
    /// with the current state shape.
    pub(crate) fn load_sessions(&self) {
        let snapshot = match read_json_retry::<Snapshot>(&self.sessions_path()) {
            Ok(Some(s)) => s,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "sessions snapshot unreadable, starting empty");
                return;
            },
        };
        let mut map = self.lock_sessions();
        for (id, raw) in snapshot.sessions {
            match serde_json::from_value::<SessionState>(raw) {
                Ok(mut state) => {
                    state.sanitize();
                    map.insert(id, state);
                },
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "dropping unreadable session");
                },
            }
        }
        tracing::info!(count = map.len(), "sessions restored from snapshot");
    }

    fn write_snapshot(&self) -> Result<()> {
        let snapshot = {
            let map = self.lock_sessions();
            let sessions = map
                .iter()
                .map(|(id, state)| Ok((id.clone(), serde_json::to_value(state)?)))
                .collect::<Result<HashMap<_, _>>>()?;
            Snapshot { sessions }
        };
        fs::write(self.sessions_path(), serde_json::to_string_pretty(&snapshot)?)?;
        Ok(())
    }
}
