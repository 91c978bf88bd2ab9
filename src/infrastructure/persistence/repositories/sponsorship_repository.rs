use std::collections::HashSet;
use std::fmt;

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter, Statement};

use crate::infrastructure::persistence::entities::sponsorship;
use crate::infrastructure::persistence::error::DbError;

/// Which side of the edge the subject identity occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Subject is being supported; counterparts are its sponsors
    IncomingSponsors,
    /// Subject is the supporter; counterparts are who it sponsors
    OutgoingSponsoring,
}

impl EdgeDirection {
    /// Column holding the subject id for this direction
    fn subject_column(&self) -> &'static str {
        match self {
            EdgeDirection::IncomingSponsors => "sponsored_id",
            EdgeDirection::OutgoingSponsoring => "sponsor_id",
        }
    }

    /// Column holding the counterpart id for this direction
    fn counterpart_column(&self) -> &'static str {
        match self {
            EdgeDirection::IncomingSponsors => "sponsor_id",
            EdgeDirection::OutgoingSponsoring => "sponsored_id",
        }
    }
}

/// Repository for sponsorship edge operations
#[derive(Clone)]
pub struct SponsorshipRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for SponsorshipRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SponsorshipRepository")
            .finish_non_exhaustive()
    }
}

impl SponsorshipRepository {
    /// Create a new SponsorshipRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Counterpart ids of every active edge around the subject in the
    /// given direction
    pub async fn stored_set(
        &self,
        github_id: i64,
        direction: EdgeDirection,
    ) -> Result<HashSet<i64>, DbError> {
        let column = match direction {
            EdgeDirection::IncomingSponsors => sponsorship::Column::SponsoredId,
            EdgeDirection::OutgoingSponsoring => sponsorship::Column::SponsorId,
        };

        let rows = sponsorship::Entity::find()
            .filter(column.eq(github_id))
            .all(&self.conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|edge| match direction {
                EdgeDirection::IncomingSponsors => edge.sponsor_id,
                EdgeDirection::OutgoingSponsoring => edge.sponsored_id,
            })
            .collect())
    }

    /// Move ended edges into history and delete them, as one statement.
    /// The CTE guarantees an edge never vanishes without its closed
    /// interval landing in sponsorship_history, even on a crash.
    pub async fn archive_and_remove(
        &self,
        github_id: i64,
        direction: EdgeDirection,
        counterparts: &[i64],
    ) -> Result<u64, DbError> {
        if counterparts.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = counterparts.iter().map(|id| id.to_string()).collect();
        let sql = format!(
            "WITH moved AS (\
                 DELETE FROM sponsorship \
                 WHERE {subject} = {id} AND {counterpart} IN ({list}) \
                 RETURNING sponsor_id, sponsored_id, created_at\
             ) \
             INSERT INTO sponsorship_history (sponsor_id, sponsored_id, started_at, ended_at) \
             SELECT sponsor_id, sponsored_id, created_at, NOW() FROM moved",
            subject = direction.subject_column(),
            counterpart = direction.counterpart_column(),
            id = github_id,
            list = ids.join(", ")
        );

        let result = self
            .conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        Ok(result.rows_affected())
    }

    /// Insert new edges around the subject. Existing pairs are left alone
    /// so their started_at timestamps survive re-observation.
    pub async fn insert_edges(
        &self,
        github_id: i64,
        direction: EdgeDirection,
        counterparts: &[i64],
    ) -> Result<(), DbError> {
        if counterparts.is_empty() {
            return Ok(());
        }

        for chunk in counterparts.chunks(500) {
            let values: Vec<String> = chunk
                .iter()
                .map(|counterpart| match direction {
                    EdgeDirection::IncomingSponsors => format!("({}, {})", counterpart, github_id),
                    EdgeDirection::OutgoingSponsoring => format!("({}, {})", github_id, counterpart),
                })
                .collect();

            let sql = format!(
                "INSERT INTO sponsorship (sponsor_id, sponsored_id) VALUES {} \
                 ON CONFLICT (sponsor_id, sponsored_id) DO NOTHING",
                values.join(", ")
            );

            self.conn
                .execute(Statement::from_string(DbBackend::Postgres, sql))
                .await?;
        }

        Ok(())
    }

}
