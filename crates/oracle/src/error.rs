//! Typed error enum for the oracle boundary.

use thiserror::Error;

/// Errors from oracle calls, tagged by the taxonomy the dialogue
/// controller reacts to.
#[derive(Debug, Error)]
pub enum OracleError {
    /// HTTP 429 whose body indicates exhausted quota. Sticky: the
    /// controller disables the oracle for the session.
    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    /// HTTP 429 without a quota marker. Transient.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Network or protocol failure before a status was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than 429.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The oracle returned non-JSON where a JSON object was required.
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API returned an empty choices array.
    #[error("empty response: no choices returned")]
    EmptyResponse,
}

impl OracleError {
    /// Whether this error must stick (disable the oracle for the session).
    #[must_use]
    pub const fn is_quota(&self) -> bool {
        matches!(*self, Self::QuotaExhausted(_))
    }

    /// Whether this error is a transient rate limit.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(*self, Self::RateLimited(_))
    }
}
