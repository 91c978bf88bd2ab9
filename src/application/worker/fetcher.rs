//! Relationship fetching for one account.
//!
//! Both sponsorship directions are pulled through cursor pagination. The
//! fetch is all-or-nothing: any GraphQL error or vanished node aborts the
//! whole snapshot so reconciliation never sees a truncated list.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::domain::models::{AccountKind, SponsorshipSnapshot};
use crate::domain::services::node_token::encode_node_id;
use crate::infrastructure::api::{ApiError, PlatformTransport};

/// Page size for relationship pagination
const PAGE_SIZE: u64 = 100;

/// Fetches the complete sponsorship snapshot for one account
pub struct RelationshipFetcher {
    transport: Arc<dyn PlatformTransport>,
}

impl RelationshipFetcher {
    /// Create a new RelationshipFetcher
    pub fn new(transport: Arc<dyn PlatformTransport>) -> Self {
        Self { transport }
    }

    /// Fetch sponsors, sponsored accounts, the private sponsor count and
    /// the minimum public tier for one account.
    pub async fn fetch(
        &self,
        kind: AccountKind,
        github_id: i64,
    ) -> Result<SponsorshipSnapshot, ApiError> {
        let node_id = encode_node_id(kind, github_id);
        let mut snapshot = SponsorshipSnapshot::default();

        self.fetch_sponsors(kind, &node_id, &mut snapshot).await?;
        self.fetch_sponsoring(kind, &node_id, &mut snapshot).await?;

        Ok(snapshot)
    }

    /// Paginate sponsorshipsAsMaintainer: public sponsor ids, private
    /// sponsor count, and the lowest monthly tier from the first page.
    async fn fetch_sponsors(
        &self,
        kind: AccountKind,
        node_id: &str,
        snapshot: &mut SponsorshipSnapshot,
    ) -> Result<(), ApiError> {
        let mut cursor: Option<String> = None;
        let mut first_page = true;

        loop {
            let payload = maintainer_payload(kind, node_id, cursor.as_deref());
            let response = self.transport.graphql(payload).await?;
            let node = fetched_node(&response, node_id)?;

            if first_page {
                snapshot.min_tier_cents = min_monthly_tier(&node);
                first_page = false;
            }

            let connection = node.get("sponsorshipsAsMaintainer").ok_or_else(|| {
                ApiError::PartialFetch(format!(
                    "Sponsor connection missing for node {}",
                    node_id
                ))
            })?;

            for entry in connection
                .pointer("/nodes")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                let is_private = entry
                    .get("privacyLevel")
                    .and_then(Value::as_str)
                    .map(|level| level == "PRIVATE")
                    .unwrap_or(false);

                if is_private {
                    // Private sponsors withhold their identity; count only.
                    snapshot.private_sponsor_count += 1;
                } else if let Some(id) = entry
                    .pointer("/sponsorEntity/databaseId")
                    .and_then(Value::as_i64)
                {
                    snapshot.sponsors.push(id);
                }
            }

            match next_cursor(connection) {
                Some(next) => cursor = Some(next),
                None => return Ok(()),
            }
        }
    }

    /// Paginate sponsorshipsAsSponsor: ids of accounts this one sponsors
    async fn fetch_sponsoring(
        &self,
        kind: AccountKind,
        node_id: &str,
        snapshot: &mut SponsorshipSnapshot,
    ) -> Result<(), ApiError> {
        let mut cursor: Option<String> = None;

        loop {
            let payload = sponsoring_payload(kind, node_id, cursor.as_deref());
            let response = self.transport.graphql(payload).await?;
            let node = fetched_node(&response, node_id)?;

            let connection = node.get("sponsorshipsAsSponsor").ok_or_else(|| {
                ApiError::PartialFetch(format!(
                    "Sponsoring connection missing for node {}",
                    node_id
                ))
            })?;

            for entry in connection
                .pointer("/nodes")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
            {
                if let Some(id) = entry
                    .pointer("/sponsorable/databaseId")
                    .and_then(Value::as_i64)
                {
                    snapshot.sponsoring.push(id);
                }
            }

            match next_cursor(connection) {
                Some(next) => cursor = Some(next),
                None => return Ok(()),
            }
        }
    }
}

/// Extract the node object, treating GraphQL errors and a missing node as
/// a partial fetch that must abort the whole snapshot.
fn fetched_node(response: &Value, node_id: &str) -> Result<Value, ApiError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            return Err(ApiError::PartialFetch(format!(
                "GraphQL errors for node {}: {}",
                node_id,
                Value::Array(errors.clone())
            )));
        }
    }

    match response.pointer("/data/node") {
        Some(node) if !node.is_null() => Ok(node.clone()),
        _ => Err(ApiError::PartialFetch(format!(
            "Node {} vanished mid-pagination",
            node_id
        ))),
    }
}

/// Lowest recurring monthly tier price in cents, if a listing exists
fn min_monthly_tier(node: &Value) -> Option<i64> {
    node.pointer("/sponsorsListing/tiers/nodes")
        .and_then(Value::as_array)?
        .iter()
        .filter(|tier| {
            !tier
                .get("isOneTime")
                .and_then(Value::as_bool)
                .unwrap_or(false)
        })
        .filter_map(|tier| tier.get("monthlyPriceInCents").and_then(Value::as_i64))
        .min()
}

fn next_cursor(connection: &Value) -> Option<String> {
    let has_next = connection
        .pointer("/pageInfo/hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !has_next {
        return None;
    }
    connection
        .pointer("/pageInfo/endCursor")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn maintainer_payload(kind: AccountKind, node_id: &str, after: Option<&str>) -> Value {
    let query = format!(
        "query($id: ID!, $first: Int!, $after: String) {{ \
           node(id: $id) {{ \
             ... on {} {{ \
               sponsorsListing {{ tiers(first: 100) {{ nodes {{ monthlyPriceInCents isOneTime }} }} }} \
               sponsorshipsAsMaintainer(first: $first, after: $after, includePrivate: true) {{ \
                 pageInfo {{ hasNextPage endCursor }} \
                 nodes {{ \
                   privacyLevel \
                   sponsorEntity {{ ... on User {{ databaseId }} ... on Organization {{ databaseId }} }} \
                 }} \
               }} \
             }} \
           }} \
         }}",
        kind.graphql_type()
    );

    json!({
        "query": query,
        "variables": { "id": node_id, "first": PAGE_SIZE, "after": after }
    })
}

fn sponsoring_payload(kind: AccountKind, node_id: &str, after: Option<&str>) -> Value {
    let query = format!(
        "query($id: ID!, $first: Int!, $after: String) {{ \
           node(id: $id) {{ \
             ... on {} {{ \
               sponsorshipsAsSponsor(first: $first, after: $after) {{ \
                 pageInfo {{ hasNextPage endCursor }} \
                 nodes {{ \
                   sponsorable {{ ... on User {{ databaseId }} ... on Organization {{ databaseId }} }} \
                 }} \
               }} \
             }} \
           }} \
         }}",
        kind.graphql_type()
    );

    json!({
        "query": query,
        "variables": { "id": node_id, "first": PAGE_SIZE, "after": after }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_min_monthly_tier_skips_one_time_tiers() {
        let node = json!({
            "sponsorsListing": { "tiers": { "nodes": [
                { "monthlyPriceInCents": 100, "isOneTime": true },
                { "monthlyPriceInCents": 500, "isOneTime": false },
                { "monthlyPriceInCents": 2500 }
            ]}}
        });
        assert_eq!(min_monthly_tier(&node), Some(500));
    }

    #[test]
    fn test_min_monthly_tier_without_listing() {
        assert_eq!(min_monthly_tier(&json!({ "sponsorsListing": null })), None);
    }

    #[test]
    fn test_fetched_node_rejects_errors_and_null_node() {
        let response = json!({
            "data": { "node": { "x": 1 } },
            "errors": [{ "message": "boom" }]
        });
        assert!(matches!(
            fetched_node(&response, "n"),
            Err(ApiError::PartialFetch(_))
        ));

        let response = json!({ "data": { "node": null } });
        assert!(matches!(
            fetched_node(&response, "n"),
            Err(ApiError::PartialFetch(_))
        ));

        let response = json!({ "data": { "node": { "x": 1 } }, "errors": [] });
        assert!(fetched_node(&response, "n").is_ok());
    }
}
