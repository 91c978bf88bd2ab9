use std::fmt;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};
use serde_json::Value;

use crate::infrastructure::persistence::error::DbError;

/// Repository for activity snapshot operations
#[derive(Clone)]
pub struct ActivityRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for ActivityRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityRepository").finish_non_exhaustive()
    }
}

impl ActivityRepository {
    /// Create a new ActivityRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Whether the user's snapshots are older than the refresh window.
    /// A user with no snapshots at all always needs a refresh.
    pub async fn needs_refresh(&self, github_id: i64, max_age_days: i64) -> Result<bool, DbError> {
        let sql = format!(
            "SELECT COALESCE(MAX(last_updated), 'epoch'::timestamptz) \
             < NOW() - INTERVAL '{} days' AS stale \
             FROM user_activity WHERE user_id = {}",
            max_age_days, github_id
        );

        let row = self
            .conn
            .query_one(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        match row {
            Some(row) => row.try_get::<bool>("", "stale").map_err(DbError::from),
            None => Ok(true),
        }
    }

    /// Upsert one calendar year's counters for a user
    pub async fn upsert_year(
        &self,
        github_id: i64,
        year: i32,
        activity_data: &Value,
    ) -> Result<(), DbError> {
        let payload = activity_data.to_string().replace('\'', "''");
        let sql = format!(
            "INSERT INTO user_activity (user_id, year, activity_data, last_updated) \
             VALUES ({}, {}, '{}'::jsonb, NOW()) \
             ON CONFLICT (user_id, year) DO UPDATE \
             SET activity_data = EXCLUDED.activity_data, last_updated = NOW()",
            github_id, year, payload
        );

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        Ok(())
    }
}
