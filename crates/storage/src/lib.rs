//! File-backed stores for kurswissen.
//!
//! All shared state lives in three places: the course catalog (JSON array,
//! rewritten on save), the sessions snapshot (single JSON object, rewritten
//! after every handled turn), and the append-only global files (JSON-LD
//! array, Turtle stream, evaluations log). Single-process discipline: one
//! [`Storage`] instance owns the data directory.

#![allow(
    clippy::multiple_inherent_impl,
    reason = "impl blocks split across files for organization"
)]

mod catalog;
mod error;
mod evaluations;
mod jsonld;
mod knowledge;
mod score;
mod sessions;
mod traces;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock};

use kurswissen_core::{Course, SessionState};
use serde::de::DeserializeOwned;

pub use catalog::CandidateHit;
pub use error::{Result, StorageError};
pub use evaluations::EvaluationRecord;
pub use jsonld::build_jsonld;
pub use knowledge::turtle_block;
pub use score::{fuzzy_score, normalize};

/// File-backed store rooted at one data directory.
pub struct Storage {
    data_dir: PathBuf,
    catalog: RwLock<Vec<Course>>,
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl Storage {
    /// Opens the store, creating the data directory if needed.
    ///
    /// A missing or malformed catalog file yields an empty index (the
    /// dialogue degrades to asking for titles); a missing snapshot yields an
    /// empty session map. Every loaded session passes the sanitizer.
    ///
    /// # Errors
    /// Returns an error only when the data directory cannot be created.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        fs::create_dir_all(data_dir.join("traces"))?;

        let catalog = match read_json_retry::<Vec<Course>>(&data_dir.join("catalog.json")) {
            Ok(Some(courses)) => {
                tracing::info!(count = courses.len(), "catalog loaded");
                courses
            },
            Ok(None) => {
                tracing::warn!(dir = %data_dir.display(), "catalog file missing, index is empty");
                Vec::new()
            },
            Err(e) => {
                tracing::warn!(error = %e, "catalog file malformed, index is empty");
                Vec::new()
            },
        };

        let storage = Self {
            data_dir,
            catalog: RwLock::new(catalog),
            sessions: Mutex::new(HashMap::new()),
        };
        storage.load_sessions();
        Ok(storage)
    }

    /// Root of the data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the per-session oracle trace files.
    #[must_use]
    pub fn traces_dir(&self) -> PathBuf {
        self.data_dir.join("traces")
    }

    pub(crate) fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }

    pub(crate) fn sessions_path(&self) -> PathBuf {
        self.data_dir.join("sessions.json")
    }

    pub(crate) fn jsonld_path(&self) -> PathBuf {
        self.data_dir.join("knowledge.jsonld")
    }

    pub(crate) fn ttl_path(&self) -> PathBuf {
        self.data_dir.join("knowledge.ttl")
    }

    pub(crate) fn evaluations_path(&self) -> PathBuf {
        self.data_dir.join("evaluations.jsonl")
    }

    pub(crate) fn read_catalog(&self) -> std::sync::RwLockReadGuard<'_, Vec<Course>> {
        self.catalog.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn write_catalog(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Course>> {
        self.catalog.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn lock_sessions(&self) -> MutexGuard<'_, HashMap<String, SessionState>> {
        self.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Reads and parses a JSON file, retrying the parse once on failure.
///
/// Concurrent whole-file rewrites can expose a torn read; a single re-read
/// is the documented tolerance. `Ok(None)` means the file does not exist.
pub(crate) fn read_json_retry<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let first = fs::read_to_string(path)?;
    match serde_json::from_str(&first) {
        Ok(value) => Ok(Some(value)),
        Err(first_err) => {
            tracing::debug!(path = %path.display(), error = %first_err, "parse failed, re-reading once");
            let second = fs::read_to_string(path)?;
            serde_json::from_str(&second).map(Some).map_err(|e| StorageError::Malformed {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })
        },
    }
}
