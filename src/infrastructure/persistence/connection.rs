use sea_orm::{Database, DatabaseConnection};

use crate::config::AppConfig;
use crate::infrastructure::persistence::error::DbError;
use crate::utils::logging;

/// Manages the database connection pool.
///
/// The worker recycles the pool on a fixed wall-clock interval and recreates
/// it reactively when connectivity loss is detected.
pub struct DbPool {
    connection: DatabaseConnection,
}

impl DbPool {
    /// Creates a new database connection pool
    pub async fn new(config: &AppConfig) -> Result<Self, DbError> {
        match Database::connect(&config.database.url).await {
            Ok(connection) => {
                logging::log_info("Database connection established");
                Ok(DbPool { connection })
            }
            Err(e) => Err(DbError::ConnectionError(format!(
                "Failed to connect to database: {}",
                e
            ))),
        }
    }

    /// Returns the database connection
    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
