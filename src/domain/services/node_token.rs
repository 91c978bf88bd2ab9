//! Opaque node identifier tokens for the GraphQL query protocol.
//!
//! The platform addresses accounts by a base64 token built from a
//! type-specific tag and the raw numeric id. The tags are not officially
//! documented but are the current standard.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::domain::models::AccountKind;

/// Encode the global node id for an account
pub fn encode_node_id(kind: AccountKind, github_id: i64) -> String {
    let prefix = match kind {
        AccountKind::User => "04:",
        AccountKind::Organization => "12:",
    };
    STANDARD.encode(format!("{}{}{}", prefix, kind.graphql_type(), github_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_token_encoding() {
        // base64("04:User583231")
        assert_eq!(
            encode_node_id(AccountKind::User, 583231),
            "MDQ6VXNlcjU4MzIzMQ=="
        );
    }

    #[test]
    fn test_organization_token_encoding() {
        // base64("12:Organization9919")
        assert_eq!(
            encode_node_id(AccountKind::Organization, 9919),
            "MTI6T3JnYW5pemF0aW9uOTkxOQ=="
        );
    }
}
