use std::fmt;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Statement,
};

use crate::infrastructure::persistence::entities::queue;
use crate::infrastructure::persistence::error::DbError;

/// Finite status lifecycle of a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Completed,
    Failed,
    Skipped,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
            QueueStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dequeued backlog item
#[derive(Debug, Clone, Copy)]
pub struct QueueItem {
    pub github_id: i64,
    pub priority: i32,
}

/// Placeholder user rows for a batch of ids, so the queue FK always holds
fn placeholder_users_sql(github_ids: &[i64]) -> String {
    let values: Vec<String> = github_ids.iter().map(|id| format!("({})", id)).collect();
    format!(
        "INSERT INTO users (github_id) VALUES {} ON CONFLICT (github_id) DO NOTHING",
        values.join(", ")
    )
}

/// Bulk enqueue upsert. On conflict the priority only ever rises and a
/// `failed` entry is resurrected to `pending` with a fresh `created_at`,
/// so it queues behind genuinely older pending work; other statuses are
/// left untouched.
fn enqueue_upsert_sql(github_ids: &[i64], priority: i32) -> String {
    let values: Vec<String> = github_ids
        .iter()
        .map(|id| format!("({}, {})", id, priority))
        .collect();
    format!(
        "INSERT INTO queue (github_id, priority) VALUES {} \
         ON CONFLICT (github_id) DO UPDATE \
         SET priority = GREATEST(queue.priority, EXCLUDED.priority), \
             status = CASE WHEN queue.status = 'failed' THEN 'pending' ELSE queue.status END, \
             created_at = CASE WHEN queue.status = 'failed' THEN NOW() ELSE queue.created_at END",
        values.join(", ")
    )
}

/// Entries transitioning back to pending are treated as freshly queued
const REQUEUE_COMPLETED_SQL: &str =
    "UPDATE queue SET status = 'pending', created_at = NOW() WHERE status = 'completed'";

fn requeue_stale_sql(days_old: i64) -> String {
    format!(
        "UPDATE queue SET status = 'pending', created_at = NOW() \
         FROM users \
         WHERE queue.github_id = users.github_id \
         AND queue.status = 'completed' \
         AND users.last_scraped < NOW() - INTERVAL '{} days'",
        days_old
    )
}

/// Repository for queue operations
#[derive(Clone)]
pub struct QueueRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for QueueRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRepository").finish_non_exhaustive()
    }
}

impl QueueRepository {
    /// Create a new QueueRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Idempotent bulk enqueue; see `enqueue_upsert_sql` for the conflict
    /// rules. Placeholder user rows are created first.
    pub async fn enqueue_or_bump(&self, github_ids: &[i64], priority: i32) -> Result<(), DbError> {
        if github_ids.is_empty() {
            return Ok(());
        }

        for chunk in github_ids.chunks(500) {
            self.conn
                .execute(Statement::from_string(
                    DbBackend::Postgres,
                    placeholder_users_sql(chunk),
                ))
                .await?;

            self.conn
                .execute(Statement::from_string(
                    DbBackend::Postgres,
                    enqueue_upsert_sql(chunk, priority),
                ))
                .await?;
        }

        Ok(())
    }

    /// Return the pending entry with the greatest priority, or None when the
    /// backlog is drained. Ties break deterministically: oldest entry first,
    /// then insertion order.
    pub async fn dequeue_highest_priority(&self) -> Result<Option<QueueItem>, DbError> {
        let result = queue::Entity::find()
            .filter(queue::Column::Status.eq(QueueStatus::Pending.as_str()))
            .order_by_desc(queue::Column::Priority)
            .order_by_asc(queue::Column::CreatedAt)
            .order_by_asc(queue::Column::Id)
            .one(&self.conn)
            .await?;

        Ok(result.map(|entry| QueueItem {
            github_id: entry.github_id,
            priority: entry.priority,
        }))
    }

    /// Transition one entry's status, optionally updating its priority
    pub async fn set_status(
        &self,
        github_id: i64,
        status: QueueStatus,
        priority: Option<i32>,
    ) -> Result<(), DbError> {
        let sql = match priority {
            Some(p) => format!(
                "UPDATE queue SET status = '{}', priority = {} WHERE github_id = {}",
                status.as_str(),
                p,
                github_id
            ),
            None => format!(
                "UPDATE queue SET status = '{}' WHERE github_id = {}",
                status.as_str(),
                github_id
            ),
        };

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        Ok(())
    }

    /// Bulk transition completed entries back to pending, used when the
    /// backlog drains entirely.
    pub async fn requeue_all_completed(&self) -> Result<u64, DbError> {
        let result = self
            .conn
            .execute(Statement::from_string(
                DbBackend::Postgres,
                REQUEUE_COMPLETED_SQL.to_string(),
            ))
            .await?;

        Ok(result.rows_affected())
    }

    /// Re-enqueue completed entries whose last scrape exceeds the given age
    pub async fn requeue_stale_completed(&self, days_old: i64) -> Result<u64, DbError> {
        let result = self
            .conn
            .execute(Statement::from_string(
                DbBackend::Postgres,
                requeue_stale_sql(days_old),
            ))
            .await?;

        Ok(result.rows_affected())
    }

    /// Remove one entry, used by the confirmed-deletion purge path
    pub async fn delete(&self, github_id: i64) -> Result<(), DbError> {
        let sql = format!("DELETE FROM queue WHERE github_id = {}", github_id);

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        Ok(())
    }
}
