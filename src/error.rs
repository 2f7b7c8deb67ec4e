use thiserror::Error;

/// Failures surfaced by the extract, analyze, and load stages.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The channel identifier resolved to no channel.
    #[error("Channel not found: {0}")]
    NotFound(String),

    /// The upstream API was unreachable or answered with something unusable.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// A snapshot with zero records was handed to the analyzer.
    #[error("No videos to analyze")]
    EmptyInput,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage constraint violated: {0}")]
    StorageConstraint(String),
}

impl EtlError {
    /// Transient failures that a caller may retry without operator input.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EtlError::ExternalService(_) | EtlError::StorageUnavailable(_)
        )
    }
}

impl From<rusqlite::Error> for EtlError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::ConstraintViolation) => {
                EtlError::StorageConstraint(err.to_string())
            }
            _ => EtlError::StorageUnavailable(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
