use chrono::{DateTime, Utc};
use serde_json::Value;

/// Classification of a platform account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    User,
    Organization,
}

impl AccountKind {
    /// Parse the `type` field of a REST profile payload
    pub fn from_api(value: &str) -> Option<Self> {
        match value {
            "User" => Some(AccountKind::User),
            "Organization" => Some(AccountKind::Organization),
            _ => None,
        }
    }

    /// GraphQL object type name used in inline fragments
    pub fn graphql_type(&self) -> &'static str {
        match self {
            AccountKind::User => "User",
            AccountKind::Organization => "Organization",
        }
    }

    /// String stored in the users table
    pub fn as_str(&self) -> &'static str {
        self.graphql_type()
    }
}

/// Full profile data for one platform account, as returned by the REST
/// profile lookup. Demographic attributes live in `Demographics`; the
/// payload never carries them.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub github_id: i64,
    pub username: String,
    pub name: Option<String>,
    pub kind: AccountKind,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub company: Option<String>,
    pub following: Option<i32>,
    pub followers: Option<i32>,
    pub hireable: Option<bool>,
    pub bio: Option<String>,
    pub public_repos: Option<i32>,
    pub public_gists: Option<i32>,
    pub twitter_username: Option<String>,
    pub email: Option<String>,
    pub github_created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Map a REST profile payload into a profile. Returns None when the
    /// payload is missing the identity fields every account must carry.
    pub fn from_json(data: &Value) -> Option<Self> {
        let github_id = data.get("id")?.as_i64()?;
        let username = data.get("login")?.as_str()?.to_string();
        let kind = AccountKind::from_api(data.get("type")?.as_str()?)?;

        Some(UserProfile {
            github_id,
            username,
            kind,
            name: string_field(data, "name"),
            location: string_field(data, "location"),
            avatar_url: string_field(data, "avatar_url"),
            profile_url: string_field(data, "html_url"),
            company: string_field(data, "company"),
            following: int_field(data, "following"),
            followers: int_field(data, "followers"),
            hireable: data.get("hireable").and_then(Value::as_bool),
            bio: string_field(data, "bio"),
            public_repos: int_field(data, "public_repos"),
            public_gists: int_field(data, "public_gists"),
            twitter_username: string_field(data, "twitter_username"),
            email: string_field(data, "email"),
            github_created_at: string_field(data, "created_at")
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn int_field(data: &Value, key: &str) -> Option<i32> {
    data.get(key).and_then(Value::as_i64).map(|v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_from_json() {
        let payload = json!({
            "id": 583231,
            "login": "octocat",
            "type": "User",
            "name": "The Octocat",
            "location": "San Francisco",
            "followers": 10000,
            "hireable": null,
            "created_at": "2011-01-25T18:44:36Z"
        });

        let profile = UserProfile::from_json(&payload).expect("profile should parse");
        assert_eq!(profile.github_id, 583231);
        assert_eq!(profile.username, "octocat");
        assert_eq!(profile.kind, AccountKind::User);
        assert_eq!(profile.followers, Some(10000));
        assert!(profile.hireable.is_none());
        assert_eq!(profile.github_created_at.unwrap().timestamp(), 1295981076);
    }

    #[test]
    fn test_profile_missing_identity_fields() {
        assert!(UserProfile::from_json(&json!({ "login": "ghost" })).is_none());
        assert!(UserProfile::from_json(&json!({ "id": 1, "login": "x", "type": "Bot" })).is_none());
    }

    #[test]
    fn test_account_kind_roundtrip() {
        assert_eq!(AccountKind::from_api("User"), Some(AccountKind::User));
        assert_eq!(
            AccountKind::from_api("Organization"),
            Some(AccountKind::Organization)
        );
        assert_eq!(AccountKind::Organization.as_str(), "Organization");
    }
}
