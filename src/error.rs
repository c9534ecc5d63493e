//! Error types for OINTment.
//!
//! Every fallible operation in the library returns [`Result<T>`]. The HTTP
//! layer converts each variant into a status code in one place
//! (`api::error`), so handlers never pick status codes by hand.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum OintmentError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    InvalidRequest(String),

    /// The usage action is unknown or lacks a required parameter.
    #[error("{0}")]
    InvalidAction(String),

    /// A plan limit would be exceeded by the requested action.
    #[error("{message}")]
    LimitExceeded {
        /// Wire name of the rejected action (`"core-run"`, ...).
        action: String,
        /// Counter value at the time of the attempt.
        current: u32,
        /// Configured limit for the counter.
        limit: u32,
        /// Human-readable explanation returned to the caller.
        message: String,
    },

    /// Purchase token or webhook signature did not verify.
    #[error("{0}")]
    AuthenticationFailed(String),

    /// A required server-side secret is not configured.
    #[error("{0}")]
    ConfigurationMissing(String),

    /// The persistence backend failed or could not be reached.
    #[error("usage store unavailable: {0}")]
    StoreUnavailable(String),

    /// A verified webhook body could not be decoded.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// Configuration file or environment could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, OintmentError>;

impl From<sqlx::Error> for OintmentError {
    fn from(err: sqlx::Error) -> Self {
        OintmentError::StoreUnavailable(err.to_string())
    }
}
