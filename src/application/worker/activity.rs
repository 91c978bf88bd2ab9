//! Per-year contribution snapshots.
//!
//! Only User accounts that hold at least one relationship are worth the
//! extra API calls. Each calendar year is fetched independently; one bad
//! year never costs the rest.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde_json::{json, Value};

use crate::application::worker::graphql_data;
use crate::domain::errors::WorkerError;
use crate::domain::models::AccountKind;
use crate::domain::services::node_token::encode_node_id;
use crate::infrastructure::api::PlatformTransport;
use crate::infrastructure::persistence::repositories::ActivityRepository;
use crate::utils::logging;

/// Collects yearly contribution counters for user accounts
pub struct ActivityCollector {
    transport: Arc<dyn PlatformTransport>,
    activity: ActivityRepository,
}

impl ActivityCollector {
    /// Create a new ActivityCollector
    pub fn new(transport: Arc<dyn PlatformTransport>, activity: ActivityRepository) -> Self {
        Self {
            transport,
            activity,
        }
    }

    /// Refresh yearly snapshots for one account if they are stale.
    /// Organizations have no contribution calendar and are skipped.
    pub async fn collect(
        &self,
        github_id: i64,
        kind: AccountKind,
        account_created_at: Option<DateTime<Utc>>,
        max_age_days: i64,
    ) -> Result<(), WorkerError> {
        if kind != AccountKind::User {
            return Ok(());
        }

        if !self.activity.needs_refresh(github_id, max_age_days).await? {
            return Ok(());
        }

        let current_year = Utc::now().year();
        let first_year = account_created_at
            .map(|at| at.year())
            .unwrap_or(current_year);
        let node_id = encode_node_id(kind, github_id);

        for year in first_year..=current_year {
            match self.fetch_year(&node_id, year).await {
                Ok(Some(counters)) => {
                    self.activity.upsert_year(github_id, year, &counters).await?;
                }
                Ok(None) => {}
                Err(e) => {
                    logging::log_warning(&format!(
                        "Skipping activity year {} for {}: {}",
                        year, github_id, e
                    ));
                }
            }
        }

        Ok(())
    }

    /// Fetch one year's counters; None when the account reports nothing
    async fn fetch_year(&self, node_id: &str, year: i32) -> Result<Option<Value>, WorkerError> {
        let payload = json!({
            "query": "query($id: ID!, $from: DateTime!, $to: DateTime!) { \
                        node(id: $id) { \
                          ... on User { \
                            contributionsCollection(from: $from, to: $to) { \
                              totalCommitContributions \
                              totalPullRequestContributions \
                              totalIssueContributions \
                              totalPullRequestReviewContributions \
                            } \
                          } \
                        } \
                      }",
            "variables": {
                "id": node_id,
                "from": format!("{}-01-01T00:00:00Z", year),
                "to": format!("{}-12-31T23:59:59Z", year),
            }
        });

        let response = self.transport.graphql(payload).await?;
        let data = graphql_data(&response)?;

        let collection = match data.pointer("/node/contributionsCollection") {
            Some(collection) if !collection.is_null() => collection,
            _ => return Ok(None),
        };

        Ok(Some(yearly_counters(collection)))
    }
}

/// Shape of one stored activity_data payload
fn yearly_counters(collection: &Value) -> Value {
    let count = |key: &str| collection.get(key).and_then(Value::as_i64).unwrap_or(0);

    json!({
        "commits": count("totalCommitContributions"),
        "pull_requests": count("totalPullRequestContributions"),
        "issues": count("totalIssueContributions"),
        "reviews": count("totalPullRequestReviewContributions"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yearly_counters_shape() {
        let collection = json!({
            "totalCommitContributions": 120,
            "totalPullRequestContributions": 14,
            "totalIssueContributions": 3,
            "totalPullRequestReviewContributions": 9
        });

        let counters = yearly_counters(&collection);
        assert_eq!(counters["commits"], 120);
        assert_eq!(counters["pull_requests"], 14);
        assert_eq!(counters["issues"], 3);
        assert_eq!(counters["reviews"], 9);
    }

    #[test]
    fn test_yearly_counters_default_to_zero() {
        let counters = yearly_counters(&json!({}));
        assert_eq!(counters["commits"], 0);
        assert_eq!(counters["reviews"], 0);
    }
}
