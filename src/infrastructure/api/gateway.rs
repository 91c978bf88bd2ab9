use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::infrastructure::api::auth::TokenProvider;
use crate::infrastructure::api::error::ApiError;
use crate::infrastructure::api::PlatformTransport;
use crate::utils::logging;

/// Attempt budget for transient failures (5xx, network)
const MAX_ATTEMPTS: u32 = 5;
/// First backoff delay; doubles on every further attempt
const INITIAL_BACKOFF_SECS: u64 = 2;
/// Safety margin added on top of the published rate-limit reset time
const RATE_LIMIT_MARGIN_SECS: u64 = 5;

/// Single choke point for all outbound calls to the remote platform.
///
/// Injects the bearer token, waits out rate-limit exhaustion, retries
/// transient failures with exponential backoff, and fails 4xx immediately.
pub struct ApiGateway {
    client: Client,
    graphql_url: String,
    rest_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiGateway {
    /// Create a new gateway from configuration
    pub fn new(config: &AppConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ApiError::ResponseError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(ApiGateway {
            client,
            graphql_url: config.api.graphql_url.clone(),
            rest_url: config.api.rest_url.clone(),
            tokens,
        })
    }

    /// Send one request with rate-limit handling and transient retries
    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut attempt: u32 = 0;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url)
                .header("Authorization", format!("Bearer {}", self.tokens.token()))
                .header("User-Agent", "sponsor-indexer");
            if let Some(payload) = body {
                request = request.json(payload);
            }

            match request.send().await {
                Ok(response) => {
                    // Rate-limit exhaustion is not a failure: wait out the
                    // published reset and retry without consuming an attempt.
                    if let Some(reset_epoch) = rate_limit_reset(response.headers()) {
                        let delay = rate_limit_delay(reset_epoch, Utc::now().timestamp());
                        logging::log_warning(&format!(
                            "Rate limit exhausted, sleeping {}s until reset",
                            delay.as_secs()
                        ));
                        sleep(delay).await;
                        continue;
                    }

                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| ApiError::ResponseError(e.to_string()));
                    }

                    if status == StatusCode::NOT_FOUND {
                        return Err(ApiError::NotFound);
                    }

                    if status.is_client_error() {
                        // Retrying cannot fix a malformed or unauthorized
                        // request; surface it immediately.
                        let text = response.text().await.unwrap_or_default();
                        logging::log_error(&format!(
                            "Client error {} for {}: not retrying",
                            status, url
                        ));
                        return Err(ApiError::Client {
                            status: status.as_u16(),
                            body: text,
                        });
                    }

                    logging::log_warning(&format!(
                        "Server error {} for {} (attempt {}/{})",
                        status,
                        url,
                        attempt + 1,
                        MAX_ATTEMPTS
                    ));
                }
                Err(e) => {
                    logging::log_warning(&format!(
                        "Network error for {} (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        MAX_ATTEMPTS,
                        e
                    ));
                }
            }

            attempt += 1;
            if attempt >= MAX_ATTEMPTS {
                return Err(ApiError::RetryExhausted {
                    attempts: MAX_ATTEMPTS,
                });
            }

            let delay = backoff_delay(attempt);
            logging::log_info(&format!("Retrying in {}s", delay.as_secs()));
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl PlatformTransport for ApiGateway {
    async fn graphql(&self, payload: Value) -> Result<Value, ApiError> {
        self.send_with_retry(Method::POST, &self.graphql_url, Some(&payload))
            .await
    }

    async fn rest_get(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.rest_url, path);
        self.send_with_retry(Method::GET, &url, None).await
    }
}

/// Extract the reset epoch when the response reports zero remaining quota
fn rate_limit_reset(headers: &HeaderMap) -> Option<i64> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?;
    if remaining != "0" {
        return None;
    }
    headers
        .get("x-ratelimit-reset")?
        .to_str()
        .ok()?
        .parse::<i64>()
        .ok()
}

/// Time to block until the published reset, plus a small safety margin
fn rate_limit_delay(reset_epoch: i64, now_epoch: i64) -> Duration {
    let wait = (reset_epoch - now_epoch).max(0) as u64;
    Duration::from_secs(wait + RATE_LIMIT_MARGIN_SECS)
}

/// Exponential backoff delay for transient-failure attempt `n` (1-based)
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(INITIAL_BACKOFF_SECS << attempt.saturating_sub(1).min(8))
}
