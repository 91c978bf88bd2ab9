pub mod auth;
pub mod error;
pub mod gateway;
pub mod location;

pub use auth::{StaticToken, TokenProvider};
pub use error::ApiError;
pub use gateway::ApiGateway;
pub use location::LocationResolver;

use async_trait::async_trait;
use serde_json::Value;

/// Transport seam for every outbound platform call.
///
/// The worker components depend on this trait instead of the concrete
/// gateway so tests can substitute synthetic responses.
#[async_trait]
pub trait PlatformTransport: Send + Sync {
    /// Execute a GraphQL query payload
    async fn graphql(&self, payload: Value) -> Result<Value, ApiError>;

    /// Execute a REST GET against a path relative to the API base URL
    async fn rest_get(&self, path: &str) -> Result<Value, ApiError>;
}
