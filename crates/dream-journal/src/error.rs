//! Error taxonomy for the record store, the analysis client and the journal service.

use thiserror::Error;

/// Failures raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying medium could not be opened or migrated.
    #[error("failed to initialize journal storage: {0}")]
    Init(String),

    #[error("journal storage is not initialized; call initialize() first")]
    Unavailable,

    #[error("a dream with id '{0}' already exists")]
    DuplicateKey(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid record: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// True when the error is a primary key / unique constraint violation.
    pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
        matches!(
            err,
            rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

/// Failures raised by the analysis client.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Transport failure or non-success HTTP status from the completion endpoint.
    #[error("analysis request failed: {0}")]
    Request(String),

    /// The completion text could not be coerced into the expected JSON shape.
    #[error("failed to parse analysis response: {0}")]
    Parse(String),

    #[error("image generation failed: {0}")]
    Image(String),

    #[error("no API key configured for the analysis service")]
    MissingApiKey,
}

/// Errors surfaced by the caller-facing journal service.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
pub type JournalResult<T> = std::result::Result<T, JournalError>;
