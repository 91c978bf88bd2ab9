use std::collections::HashSet;
use std::fmt;

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter, Set,
    Statement, TransactionTrait,
};

use crate::domain::models::{AccountKind, Demographics, UserProfile};
use crate::infrastructure::persistence::entities::users;
use crate::infrastructure::persistence::error::DbError;

/// Identity facts the worker needs before deciding how to process an item
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub github_id: i64,
    pub username: Option<String>,
    pub kind: Option<AccountKind>,
    pub is_enriched: bool,
    pub demographics: Demographics,
}

/// Repository for user operations
#[derive(Clone)]
pub struct UsersRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for UsersRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsersRepository").finish_non_exhaustive()
    }
}

impl UsersRepository {
    /// Create a new UsersRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Look up a user row and the enrichment facts attached to it
    pub async fn find_identity(&self, github_id: i64) -> Result<Option<UserIdentity>, DbError> {
        let result = users::Entity::find_by_id(github_id).one(&self.conn).await?;

        Ok(result.map(|row| UserIdentity {
            github_id: row.github_id,
            username: row.username,
            kind: row.account_type.as_deref().and_then(AccountKind::from_api),
            is_enriched: row.is_enriched,
            demographics: Demographics {
                gender: row.gender,
                has_pronouns: row.has_pronouns,
            },
        }))
    }

    /// Insert bare placeholder rows for every id not present yet
    pub async fn ensure_placeholders(&self, github_ids: &[i64]) -> Result<(), DbError> {
        if github_ids.is_empty() {
            return Ok(());
        }

        for chunk in github_ids.chunks(500) {
            let values: Vec<String> = chunk.iter().map(|id| format!("({})", id)).collect();
            let sql = format!(
                "INSERT INTO users (github_id) VALUES {} ON CONFLICT (github_id) DO NOTHING",
                values.join(", ")
            );

            self.conn
                .execute(Statement::from_string(DbBackend::Postgres, sql))
                .await?;
        }

        Ok(())
    }

    /// Return the subset of ids that have no user row yet
    pub async fn filter_unknown(&self, github_ids: &[i64]) -> Result<Vec<i64>, DbError> {
        if github_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut known: HashSet<i64> = HashSet::new();
        for chunk in github_ids.chunks(500) {
            let rows = users::Entity::find()
                .filter(users::Column::GithubId.is_in(chunk.iter().copied()))
                .all(&self.conn)
                .await?;
            known.extend(rows.into_iter().map(|r| r.github_id));
        }

        let mut unknown: Vec<i64> = github_ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect();
        unknown.sort_unstable();
        unknown.dedup();

        Ok(unknown)
    }

    /// Upsert the full profile for an identity. Placeholder rows are
    /// promoted in place; existing profiles are refreshed.
    pub async fn upsert_profile(
        &self,
        profile: &UserProfile,
        demographics: &Demographics,
    ) -> Result<(), DbError> {
        let model = users::ActiveModel {
            github_id: Set(profile.github_id),
            username: Set(Some(profile.username.clone())),
            name: Set(profile.name.clone()),
            account_type: Set(Some(profile.kind.as_str().to_string())),
            gender: Set(demographics.gender.clone()),
            has_pronouns: Set(demographics.has_pronouns),
            location: Set(profile.location.clone()),
            avatar_url: Set(profile.avatar_url.clone()),
            profile_url: Set(profile.profile_url.clone()),
            company: Set(profile.company.clone()),
            following: Set(profile.following),
            followers: Set(profile.followers),
            hireable: Set(profile.hireable),
            bio: Set(profile.bio.clone()),
            public_repos: Set(profile.public_repos),
            public_gists: Set(profile.public_gists),
            twitter_username: Set(profile.twitter_username.clone()),
            email: Set(profile.email.clone()),
            is_enriched: Set(true),
            github_created_at: Set(profile.github_created_at.map(Into::into)),
            ..Default::default()
        };

        users::Entity::insert(model)
            .on_conflict(
                OnConflict::column(users::Column::GithubId)
                    .update_columns([
                        users::Column::Username,
                        users::Column::Name,
                        users::Column::AccountType,
                        users::Column::Gender,
                        users::Column::HasPronouns,
                        users::Column::Location,
                        users::Column::AvatarUrl,
                        users::Column::ProfileUrl,
                        users::Column::Company,
                        users::Column::Following,
                        users::Column::Followers,
                        users::Column::Hireable,
                        users::Column::Bio,
                        users::Column::PublicRepos,
                        users::Column::PublicGists,
                        users::Column::TwitterUsername,
                        users::Column::Email,
                        users::Column::IsEnriched,
                        users::Column::GithubCreatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Resolve a handle collision detected during enrichment.
    ///
    /// When the fetched profile's handle is already held by a different
    /// identity row, that row is stale: the handle moved. Its foreign
    /// references (edges, history, activity, queue entry) migrate to the
    /// surviving identity and the stale row is deleted, all in one
    /// transaction. Returns whether a merge happened.
    pub async fn merge_handle_collision(
        &self,
        github_id: i64,
        username: &str,
    ) -> Result<bool, DbError> {
        let escaped = username.replace('\'', "''");
        let txn = self.conn.begin().await?;

        let row = txn
            .query_one(Statement::from_string(
                DbBackend::Postgres,
                format!(
                    "SELECT github_id FROM users WHERE username = '{}' AND github_id <> {} LIMIT 1",
                    escaped, github_id
                ),
            ))
            .await?;

        let stale_id = match row {
            Some(row) => row.try_get::<i64>("", "github_id")?,
            None => return Ok(false),
        };

        // Edges already present under the surviving id would collide with
        // the migrated ones; drop the duplicates before re-pointing.
        let statements = [
            format!(
                "DELETE FROM sponsorship s WHERE s.sponsor_id = {stale} AND EXISTS \
                 (SELECT 1 FROM sponsorship x WHERE x.sponsor_id = {new} AND x.sponsored_id = s.sponsored_id)",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "UPDATE sponsorship SET sponsor_id = {new} WHERE sponsor_id = {stale}",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "DELETE FROM sponsorship s WHERE s.sponsored_id = {stale} AND EXISTS \
                 (SELECT 1 FROM sponsorship x WHERE x.sponsored_id = {new} AND x.sponsor_id = s.sponsor_id)",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "UPDATE sponsorship SET sponsored_id = {new} WHERE sponsored_id = {stale}",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "UPDATE sponsorship_history SET sponsor_id = {new} WHERE sponsor_id = {stale}",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "UPDATE sponsorship_history SET sponsored_id = {new} WHERE sponsored_id = {stale}",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "DELETE FROM user_activity ua WHERE ua.user_id = {stale} AND EXISTS \
                 (SELECT 1 FROM user_activity x WHERE x.user_id = {new} AND x.year = ua.year)",
                stale = stale_id,
                new = github_id
            ),
            format!(
                "UPDATE user_activity SET user_id = {new} WHERE user_id = {stale}",
                stale = stale_id,
                new = github_id
            ),
            format!("DELETE FROM queue WHERE github_id = {}", stale_id),
            format!("DELETE FROM users WHERE github_id = {}", stale_id),
        ];

        for sql in statements {
            txn.execute(Statement::from_string(DbBackend::Postgres, sql))
                .await?;
        }

        txn.commit().await?;
        Ok(true)
    }

    /// Record the end of a successful scrape cycle for an identity
    pub async fn finalize_scrape(
        &self,
        github_id: i64,
        private_sponsor_count: i32,
        min_tier_cents: Option<i64>,
    ) -> Result<(), DbError> {
        let min_cost = min_tier_cents
            .map(|c| c.to_string())
            .unwrap_or_else(|| "NULL".to_string());
        let sql = format!(
            "UPDATE users SET last_scraped = NOW(), private_sponsor_count = {}, \
             min_sponsor_cost_cents = {} WHERE github_id = {}",
            private_sponsor_count, min_cost, github_id
        );

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await?;

        Ok(())
    }

    /// Cascade purge for an identity the platform confirmed gone: edges in
    /// both directions, history, activity, queue entry, then the row itself.
    pub async fn purge(&self, github_id: i64) -> Result<(), DbError> {
        let txn = self.conn.begin().await?;

        let statements = [
            format!(
                "DELETE FROM sponsorship WHERE sponsor_id = {id} OR sponsored_id = {id}",
                id = github_id
            ),
            format!(
                "DELETE FROM sponsorship_history WHERE sponsor_id = {id} OR sponsored_id = {id}",
                id = github_id
            ),
            format!("DELETE FROM user_activity WHERE user_id = {}", github_id),
            format!("DELETE FROM queue WHERE github_id = {}", github_id),
            format!("DELETE FROM users WHERE github_id = {}", github_id),
        ];

        for sql in statements {
            txn.execute(Statement::from_string(DbBackend::Postgres, sql))
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}
