use std::error::Error;
use std::fmt;

use crate::infrastructure::api::ApiError;
use crate::infrastructure::persistence::error::DbError;

/// Error type for one worker cycle
#[derive(Debug)]
pub enum WorkerError {
    ApiError(ApiError),
    DbError(DbError),
    StateError(String),
    ProcessingError(String),
}

impl WorkerError {
    /// Whether the error is a database connectivity loss, handled at the
    /// loop level by reconnecting and retrying the same iteration.
    pub fn is_connectivity_loss(&self) -> bool {
        matches!(self, WorkerError::DbError(e) if e.is_connectivity_loss())
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::ApiError(e) => write!(f, "API error: {}", e),
            WorkerError::DbError(e) => write!(f, "Database error: {}", e),
            WorkerError::StateError(msg) => write!(f, "Run-state error: {}", msg),
            WorkerError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl Error for WorkerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerError::ApiError(e) => Some(e),
            WorkerError::DbError(e) => Some(e),
            WorkerError::StateError(_) => None,
            WorkerError::ProcessingError(_) => None,
        }
    }
}

impl From<ApiError> for WorkerError {
    fn from(error: ApiError) -> Self {
        WorkerError::ApiError(error)
    }
}

impl From<DbError> for WorkerError {
    fn from(error: DbError) -> Self {
        WorkerError::DbError(error)
    }
}
