//! Relationship fetch behaviour over a scripted transport.
//!
//! The fetch must either produce the complete snapshot or fail; a GraphQL
//! error payload or a vanished node mid-pagination aborts the whole fetch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use sponsor_indexer::application::worker::fetcher::RelationshipFetcher;
use sponsor_indexer::domain::models::AccountKind;
use sponsor_indexer::infrastructure::api::{ApiError, PlatformTransport};

/// Transport that replays a fixed sequence of GraphQL responses
struct ScriptedTransport {
    responses: Mutex<VecDeque<Value>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl PlatformTransport for ScriptedTransport {
    async fn graphql(&self, _payload: Value) -> Result<Value, ApiError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::ResponseError("script exhausted".to_string()))
    }

    async fn rest_get(&self, _path: &str) -> Result<Value, ApiError> {
        unreachable!("relationship fetch never touches the REST API")
    }
}

fn maintainer_page(
    sponsors: &[(i64, &str)],
    has_next: bool,
    tiers: Option<Vec<Value>>,
) -> Value {
    let nodes: Vec<Value> = sponsors
        .iter()
        .map(|(id, privacy)| {
            json!({
                "privacyLevel": privacy,
                "sponsorEntity": { "databaseId": id },
            })
        })
        .collect();

    json!({ "data": { "node": {
        "sponsorsListing": tiers.map(|nodes| json!({ "tiers": { "nodes": nodes } })),
        "sponsorshipsAsMaintainer": {
            "pageInfo": { "hasNextPage": has_next, "endCursor": "cursor" },
            "nodes": nodes,
        },
    }}})
}

fn sponsoring_page(sponsored: &[i64], has_next: bool) -> Value {
    let nodes: Vec<Value> = sponsored
        .iter()
        .map(|id| json!({ "sponsorable": { "databaseId": id } }))
        .collect();

    json!({ "data": { "node": {
        "sponsorshipsAsSponsor": {
            "pageInfo": { "hasNextPage": has_next, "endCursor": "cursor" },
            "nodes": nodes,
        },
    }}})
}

#[tokio::test]
async fn test_complete_snapshot_across_both_directions() {
    let tiers = vec![
        json!({ "monthlyPriceInCents": 2500, "isOneTime": false }),
        json!({ "monthlyPriceInCents": 500, "isOneTime": false }),
        json!({ "monthlyPriceInCents": 100, "isOneTime": true }),
    ];
    let transport = Arc::new(ScriptedTransport::new(vec![
        maintainer_page(&[(11, "PUBLIC"), (12, "PRIVATE"), (13, "PUBLIC")], true, Some(tiers)),
        maintainer_page(&[(14, "PUBLIC")], false, None),
        sponsoring_page(&[21, 22], false),
    ]));

    let fetcher = RelationshipFetcher::new(transport);
    let snapshot = fetcher
        .fetch(AccountKind::User, 583231)
        .await
        .expect("fetch succeeds");

    assert_eq!(snapshot.sponsors, vec![11, 13, 14]);
    assert_eq!(snapshot.private_sponsor_count, 1);
    assert_eq!(snapshot.sponsoring, vec![21, 22]);
    // One-time tiers never count toward the minimum recurring price.
    assert_eq!(snapshot.min_tier_cents, Some(500));
}

#[tokio::test]
async fn test_only_private_sponsors_are_counted() {
    // Sponsors whose entity carries no id (deleted or unsupported account
    // types) are dropped when public, never folded into the private count.
    let page = json!({ "data": { "node": {
        "sponsorsListing": null,
        "sponsorshipsAsMaintainer": {
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": [
                { "privacyLevel": "PUBLIC", "sponsorEntity": {} },
                { "privacyLevel": "PRIVATE", "sponsorEntity": {} },
                { "privacyLevel": "PRIVATE", "sponsorEntity": { "databaseId": 12 } },
                { "privacyLevel": "PUBLIC", "sponsorEntity": { "databaseId": 31 } },
            ],
        },
    }}});
    let transport = Arc::new(ScriptedTransport::new(vec![
        page,
        sponsoring_page(&[], false),
    ]));

    let fetcher = RelationshipFetcher::new(transport);
    let snapshot = fetcher
        .fetch(AccountKind::User, 583231)
        .await
        .expect("fetch succeeds");

    assert_eq!(snapshot.sponsors, vec![31]);
    assert_eq!(snapshot.private_sponsor_count, 2);
}

#[tokio::test]
async fn test_graphql_errors_mid_pagination_abort_the_fetch() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        maintainer_page(&[(11, "PUBLIC")], true, None),
        json!({
            "data": { "node": null },
            "errors": [{ "message": "Something went wrong" }],
        }),
    ]));

    let fetcher = RelationshipFetcher::new(transport);
    let result = fetcher.fetch(AccountKind::User, 583231).await;

    assert!(matches!(result, Err(ApiError::PartialFetch(_))));
}

#[tokio::test]
async fn test_vanished_node_aborts_the_fetch() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        maintainer_page(&[(11, "PUBLIC")], false, None),
        json!({ "data": { "node": null } }),
    ]));

    let fetcher = RelationshipFetcher::new(transport);
    let result = fetcher.fetch(AccountKind::Organization, 9919).await;

    // The sponsoring direction saw no node at all; nothing partial may
    // survive as a snapshot.
    assert!(matches!(result, Err(ApiError::PartialFetch(_))));
}

#[tokio::test]
async fn test_organizations_use_their_own_node_fragment() {
    struct FragmentCheck;

    #[async_trait]
    impl PlatformTransport for FragmentCheck {
        async fn graphql(&self, payload: Value) -> Result<Value, ApiError> {
            let query = payload
                .get("query")
                .and_then(Value::as_str)
                .expect("payload carries a query");
            assert!(query.contains("... on Organization {"));
            Err(ApiError::ResponseError("stop here".to_string()))
        }

        async fn rest_get(&self, _path: &str) -> Result<Value, ApiError> {
            unreachable!()
        }
    }

    let fetcher = RelationshipFetcher::new(Arc::new(FragmentCheck));
    let result = fetcher.fetch(AccountKind::Organization, 9919).await;
    assert!(matches!(result, Err(ApiError::ResponseError(_))));
}
