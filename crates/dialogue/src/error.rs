use std::result::Result as StdResult;

use thiserror::Error;

/// Errors surfaced to the HTTP layer by the dialogue entry points.
///
/// Oracle failures never appear here: the controller converts them into
/// user-visible assistant messages inside the turn.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// Malformed caller input (out-of-range ratings, …) → HTTP 400.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Storage failure, including unknown sessions → HTTP 404/500.
    #[error(transparent)]
    Storage(#[from] kurswissen_storage::StorageError),
}

/// Result type alias for dialogue entry points.
pub type Result<T> = StdResult<T, DialogueError>;
