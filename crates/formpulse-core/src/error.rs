//! Error types for FormPulse

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the submission and analytics paths.
///
/// Aggregation never produces one of these: malformed stored answers are
/// treated as not countable instead.
#[derive(Error, Debug)]
pub enum FormsError {
    /// Form or response missing
    #[error("{0} not found")]
    NotFound(String),

    /// Id already taken
    #[error("{0} already exists")]
    Conflict(String),

    /// Form exists but does not accept responses
    #[error("form not published")]
    NotPublished,

    /// Submitted answers or form definition violate the schema
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage collaborator failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StoreError> for FormsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => FormsError::NotFound(what),
            StoreError::Conflict(what) => FormsError::Conflict(what),
            other => FormsError::Storage(other.to_string()),
        }
    }
}

/// Result type for FormPulse
pub type Result<T> = std::result::Result<T, FormsError>;
