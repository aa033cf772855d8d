use std::io;
use std::result::Result as StdResult;

use thiserror::Error;

/// Errors from core domain operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO operation error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid input provided by caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for core operations.
pub type Result<T> = StdResult<T, CoreError>;
