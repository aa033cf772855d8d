use std::io;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

/// Errors from the file-backed stores.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("malformed file {path}: {detail}")]
    Malformed { path: PathBuf, detail: String },
}

/// Result type alias for storage operations.
pub type Result<T> = StdResult<T, StorageError>;
