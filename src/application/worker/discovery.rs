//! Search-based discovery of sponsorable accounts.
//!
//! The platform's search API enumerates at most a fixed number of results
//! per query, so the full account space is scanned by account-creation date
//! ranges, bisecting any range whose result count exceeds the ceiling.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};

use crate::application::worker::graphql_data;
use crate::config::SearchConfig;
use crate::domain::errors::WorkerError;
use crate::infrastructure::api::PlatformTransport;
use crate::infrastructure::persistence::repositories::QueueRepository;
use crate::utils::logging;

/// Priority assigned to accounts found by a discovery sweep
pub const DISCOVERY_PRIORITY: i32 = 1;

/// Which slice of the account space a sweep scans
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Everything since the platform's inception
    Full,
    /// Recently created accounts only, newest first
    Incremental,
}

/// Receiver of discovered account ids.
///
/// The queue repository implements this in production; tests collect ids
/// in memory to verify coverage without a database.
#[async_trait]
pub trait DiscoverySink: Send + Sync {
    async fn discovered(&self, github_ids: &[i64], priority: i32) -> Result<(), WorkerError>;
}

#[async_trait]
impl DiscoverySink for QueueRepository {
    async fn discovered(&self, github_ids: &[i64], priority: i32) -> Result<(), WorkerError> {
        self.enqueue_or_bump(github_ids, priority).await?;
        Ok(())
    }
}

/// Discovery engine over the search API
pub struct DiscoveryEngine {
    transport: Arc<dyn PlatformTransport>,
    config: SearchConfig,
}

impl DiscoveryEngine {
    /// Create a new DiscoveryEngine
    pub fn new(transport: Arc<dyn PlatformTransport>, config: SearchConfig) -> Self {
        Self { transport, config }
    }

    /// Run one sweep, feeding every discovered id into the sink.
    /// Returns how many ids were delivered.
    pub async fn run(
        &self,
        mode: DiscoveryMode,
        sink: &dyn DiscoverySink,
    ) -> Result<u64, WorkerError> {
        let today = Utc::now().date_naive();
        let (start, sort_suffix) = match mode {
            DiscoveryMode::Full => (self.parse_inception()?, ""),
            DiscoveryMode::Incremental => (
                today - Duration::days(self.config.incremental_window_days),
                " sort:joined-desc",
            ),
        };

        logging::log_info(&format!(
            "Starting {:?} discovery sweep over {}..{}",
            mode, start, today
        ));

        let mut delivered: u64 = 0;
        // Explicit work stack; bisection depth is bounded by the range width
        // but recursion across await points is not worth the trouble.
        let mut ranges: Vec<(NaiveDate, NaiveDate)> = vec![(start, today)];

        while let Some((from, to)) = ranges.pop() {
            let query = search_query(from, to, sort_suffix);
            let count = self.probe_count(&query).await?;

            if count == 0 {
                continue;
            }

            if count > self.config.result_ceiling && from < to {
                let span = (to - from).num_days();
                let mid = from + Duration::days(span / 2);
                ranges.push((mid + Duration::days(1), to));
                ranges.push((from, mid));
                continue;
            }

            if count > self.config.result_ceiling {
                // A single day over the enumeration ceiling cannot be split
                // further; page what the API will give us and record the gap.
                logging::log_warning(&format!(
                    "{} accounts created on {} exceed the {}-result ceiling, coverage gap",
                    count, from, self.config.result_ceiling
                ));
            }

            delivered += self.page_range(&query, sink).await?;
        }

        logging::log_info(&format!(
            "Discovery sweep delivered {} account ids",
            delivered
        ));
        Ok(delivered)
    }

    /// Ask the search API how many accounts the query matches
    async fn probe_count(&self, query: &str) -> Result<u64, WorkerError> {
        let response = self
            .transport
            .graphql(search_payload(query, 1, None))
            .await?;
        let data = graphql_data(&response)?;

        data.pointer("/search/userCount")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                WorkerError::ProcessingError(format!(
                    "Search count response missing userCount for query '{}'",
                    query
                ))
            })
    }

    /// Cursor-paginate one query, delivering each page of ids to the sink
    async fn page_range(&self, query: &str, sink: &dyn DiscoverySink) -> Result<u64, WorkerError> {
        let mut delivered: u64 = 0;
        let mut cursor: Option<String> = None;

        loop {
            let response = self
                .transport
                .graphql(search_payload(
                    query,
                    self.config.page_size,
                    cursor.as_deref(),
                ))
                .await?;
            let data = graphql_data(&response)?;

            let search = data.get("search").ok_or_else(|| {
                WorkerError::ProcessingError("Search response missing search object".to_string())
            })?;

            let ids: Vec<i64> = search
                .pointer("/nodes")
                .and_then(Value::as_array)
                .map(|nodes| {
                    nodes
                        .iter()
                        .filter_map(|node| node.get("databaseId").and_then(Value::as_i64))
                        .collect()
                })
                .unwrap_or_default();

            if !ids.is_empty() {
                sink.discovered(&ids, DISCOVERY_PRIORITY).await?;
                delivered += ids.len() as u64;
            }

            let has_next = search
                .pointer("/pageInfo/hasNextPage")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            cursor = search
                .pointer("/pageInfo/endCursor")
                .and_then(Value::as_str)
                .map(str::to_string);

            if !has_next || cursor.is_none() {
                return Ok(delivered);
            }
        }
    }

    fn parse_inception(&self) -> Result<NaiveDate, WorkerError> {
        NaiveDate::parse_from_str(&self.config.inception_date, "%Y-%m-%d").map_err(|e| {
            WorkerError::StateError(format!(
                "Invalid inception date '{}': {}",
                self.config.inception_date, e
            ))
        })
    }
}

/// Search query over sponsorable accounts created within a date range
fn search_query(from: NaiveDate, to: NaiveDate, sort_suffix: &str) -> String {
    format!("is:sponsorable created:{}..{}{}", from, to, sort_suffix)
}

/// GraphQL payload for one search page
fn search_payload(query: &str, first: u64, after: Option<&str>) -> Value {
    json!({
        "query": "query($q: String!, $first: Int!, $after: String) { \
                    search(type: USER, query: $q, first: $first, after: $after) { \
                      userCount \
                      pageInfo { hasNextPage endCursor } \
                      nodes { \
                        ... on User { databaseId } \
                        ... on Organization { databaseId } \
                      } \
                    } \
                  }",
        "variables": { "q": query, "first": first, "after": after }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_format() {
        let from = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2008, 6, 30).unwrap();
        assert_eq!(
            search_query(from, to, ""),
            "is:sponsorable created:2008-01-01..2008-06-30"
        );
        assert_eq!(
            search_query(from, to, " sort:joined-desc"),
            "is:sponsorable created:2008-01-01..2008-06-30 sort:joined-desc"
        );
    }

    #[test]
    fn test_search_payload_carries_cursor() {
        let payload = search_payload("is:sponsorable", 100, Some("abc"));
        assert_eq!(payload.pointer("/variables/first").unwrap(), 100);
        assert_eq!(payload.pointer("/variables/after").unwrap(), "abc");

        let payload = search_payload("is:sponsorable", 1, None);
        assert!(payload.pointer("/variables/after").unwrap().is_null());
    }
}
