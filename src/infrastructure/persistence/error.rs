use std::error::Error;
use std::fmt;

/// Error type for database operations
#[derive(Debug)]
pub enum DbError {
    /// Error from SeaORM
    SeaOrmError(sea_orm::DbErr),
    /// Connection error
    ConnectionError(String),
}

impl DbError {
    /// Whether this error reports lost connectivity. The worker reacts by
    /// reconnecting and retrying the iteration instead of halting.
    pub fn is_connectivity_loss(&self) -> bool {
        match self {
            DbError::ConnectionError(_) => true,
            DbError::SeaOrmError(e) => matches!(
                e,
                sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_)
            ),
        }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::SeaOrmError(e) => write!(f, "Database error: {}", e),
            DbError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
        }
    }
}

impl Error for DbError {}

impl From<sea_orm::DbErr> for DbError {
    fn from(err: sea_orm::DbErr) -> Self {
        DbError::SeaOrmError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbErr, RuntimeErr};

    #[test]
    fn test_dropped_connection_is_classified_through_from() {
        // Raw-SQL statement failures arrive as DbErr; a dropped connection
        // must stay detectable so the worker reconnects instead of halting.
        let err = DbError::from(DbErr::Conn(RuntimeErr::Internal(
            "connection reset by peer".to_string(),
        )));
        assert!(err.is_connectivity_loss());

        let err = DbError::from(DbErr::Custom("constraint violation".to_string()));
        assert!(!err.is_connectivity_loss());
    }

    #[test]
    fn test_failed_pool_creation_is_connectivity_loss() {
        let err = DbError::ConnectionError("refused".to_string());
        assert!(err.is_connectivity_loss());
    }
}
