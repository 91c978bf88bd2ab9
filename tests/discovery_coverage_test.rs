//! Discovery sweep coverage over a synthetic account space.
//!
//! A mock search backend holds accounts keyed by creation date. The sweep
//! must deliver every account exactly where the real API could: each range
//! it pages through stays under the result ceiling unless the range is a
//! single day, and the union of all pages covers the whole space.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use sponsor_indexer::application::worker::discovery::{
    DiscoveryEngine, DiscoveryMode, DiscoverySink,
};
use sponsor_indexer::config::SearchConfig;
use sponsor_indexer::domain::errors::WorkerError;
use sponsor_indexer::infrastructure::api::{ApiError, PlatformTransport};

/// One first-page pagination observed by the mock backend
struct PagedRange {
    from: NaiveDate,
    to: NaiveDate,
    count: u64,
}

/// Search backend over a fixed (creation date, id) account space
struct SearchSpaceTransport {
    accounts: Vec<(NaiveDate, i64)>,
    paged_ranges: Mutex<Vec<PagedRange>>,
}

impl SearchSpaceTransport {
    fn new(accounts: Vec<(NaiveDate, i64)>) -> Self {
        Self {
            accounts,
            paged_ranges: Mutex::new(Vec::new()),
        }
    }

    fn matching(&self, from: NaiveDate, to: NaiveDate) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .accounts
            .iter()
            .filter(|(date, _)| *date >= from && *date <= to)
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

fn parse_range(query: &str) -> (NaiveDate, NaiveDate) {
    let created = query
        .split_whitespace()
        .find_map(|token| token.strip_prefix("created:"))
        .expect("query carries a created: range");
    let (from, to) = created.split_once("..").expect("range has two dates");
    (
        NaiveDate::parse_from_str(from, "%Y-%m-%d").expect("valid from date"),
        NaiveDate::parse_from_str(to, "%Y-%m-%d").expect("valid to date"),
    )
}

#[async_trait]
impl PlatformTransport for SearchSpaceTransport {
    async fn graphql(&self, payload: Value) -> Result<Value, ApiError> {
        let query = payload
            .pointer("/variables/q")
            .and_then(Value::as_str)
            .expect("payload carries the search query");
        let first = payload
            .pointer("/variables/first")
            .and_then(Value::as_u64)
            .expect("payload carries a page size") as usize;
        let offset: usize = payload
            .pointer("/variables/after")
            .and_then(Value::as_str)
            .map(|cursor| cursor.parse().expect("cursor is a mock offset"))
            .unwrap_or(0);

        let (from, to) = parse_range(query);
        let ids = self.matching(from, to);

        // first == 1 is the count probe; anything larger is pagination.
        if first > 1 && offset == 0 {
            self.paged_ranges.lock().unwrap().push(PagedRange {
                from,
                to,
                count: ids.len() as u64,
            });
        }

        let page: Vec<Value> = ids
            .iter()
            .skip(offset)
            .take(first)
            .map(|id| json!({ "databaseId": id }))
            .collect();
        let has_next = offset + first < ids.len();

        Ok(json!({
            "data": {
                "search": {
                    "userCount": ids.len() as u64,
                    "pageInfo": {
                        "hasNextPage": has_next,
                        "endCursor": (offset + first).to_string(),
                    },
                    "nodes": page,
                }
            }
        }))
    }

    async fn rest_get(&self, _path: &str) -> Result<Value, ApiError> {
        unreachable!("discovery never touches the REST API")
    }
}

/// Sink that collects delivered ids in memory
#[derive(Default)]
struct CollectingSink {
    ids: Mutex<HashSet<i64>>,
}

#[async_trait]
impl DiscoverySink for CollectingSink {
    async fn discovered(&self, github_ids: &[i64], priority: i32) -> Result<(), WorkerError> {
        assert_eq!(priority, 1, "discovery enqueues at the base priority");
        self.ids.lock().unwrap().extend(github_ids.iter().copied());
        Ok(())
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2008, 1, d).expect("valid date")
}

fn search_config() -> SearchConfig {
    SearchConfig {
        result_ceiling: 5,
        page_size: 3,
        inception_date: "2008-01-01".to_string(),
        incremental_window_days: 14,
    }
}

#[tokio::test]
async fn test_full_sweep_covers_the_whole_account_space() {
    // Sparse days plus one day over the ceiling, forcing both bisection
    // and the single-day overflow path.
    let mut accounts = vec![
        (day(1), 100),
        (day(1), 101),
        (day(2), 200),
        (day(5), 500),
        (day(5), 501),
        (day(8), 800),
    ];
    for i in 0..7 {
        accounts.push((day(3), 300 + i));
    }
    let expected: HashSet<i64> = accounts.iter().map(|(_, id)| *id).collect();

    let transport = Arc::new(SearchSpaceTransport::new(accounts));
    let sink = CollectingSink::default();
    let engine = DiscoveryEngine::new(transport.clone(), search_config());

    let delivered = engine
        .run(DiscoveryMode::Full, &sink)
        .await
        .expect("sweep succeeds");

    assert_eq!(delivered, expected.len() as u64);
    assert_eq!(*sink.ids.lock().unwrap(), expected);

    // Every range that was paged either fit under the ceiling or could
    // not be split further.
    let paged = transport.paged_ranges.lock().unwrap();
    assert!(!paged.is_empty());
    for range in paged.iter() {
        assert!(
            range.count <= 5 || range.from == range.to,
            "paged {}..{} with {} results over the ceiling",
            range.from,
            range.to,
            range.count
        );
    }
}

#[tokio::test]
async fn test_incremental_sweep_requests_newest_first() {
    struct QueryCapture {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PlatformTransport for QueryCapture {
        async fn graphql(&self, payload: Value) -> Result<Value, ApiError> {
            let query = payload
                .pointer("/variables/q")
                .and_then(Value::as_str)
                .expect("payload carries the search query")
                .to_string();
            self.queries.lock().unwrap().push(query);
            Ok(json!({ "data": { "search": {
                "userCount": 0,
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [],
            }}}))
        }

        async fn rest_get(&self, _path: &str) -> Result<Value, ApiError> {
            unreachable!()
        }
    }

    let transport = Arc::new(QueryCapture {
        queries: Mutex::new(Vec::new()),
    });
    let sink = CollectingSink::default();
    let engine = DiscoveryEngine::new(transport.clone(), search_config());

    engine
        .run(DiscoveryMode::Incremental, &sink)
        .await
        .expect("sweep succeeds");

    let queries = transport.queries.lock().unwrap();
    assert_eq!(queries.len(), 1, "empty window needs a single probe");
    assert!(queries[0].starts_with("is:sponsorable created:"));
    assert!(queries[0].ends_with(" sort:joined-desc"));
    assert!(sink.ids.lock().unwrap().is_empty());
}
