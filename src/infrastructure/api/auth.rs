//! Credential boundary for the platform API.
//!
//! Browser-driven credential refresh is an external collaborator; the
//! gateway only asks for the current token and whether a refresh is due.

use async_trait::async_trait;

use crate::infrastructure::api::error::ApiError;

/// Provider of the bearer token attached to every outbound call
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// The token to attach to the next request
    fn token(&self) -> String;

    /// Whether the credential is close to expiry and should be refreshed
    fn is_expiring_soon(&self) -> bool;

    /// Refresh the credential in place
    async fn refresh(&self) -> Result<(), ApiError>;
}

/// A long-lived personal access token taken from the environment
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    fn token(&self) -> String {
        self.token.clone()
    }

    fn is_expiring_soon(&self) -> bool {
        false
    }

    async fn refresh(&self) -> Result<(), ApiError> {
        Ok(())
    }
}
