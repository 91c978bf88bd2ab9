use std::error::Error;
use std::fmt;

/// Error type for platform API operations
#[derive(Debug)]
pub enum ApiError {
    /// Network-level failure (timeout, connection refused); retried
    Network(reqwest::Error),
    /// Client-side failure (4xx other than rate limit or 404); never retried
    Client { status: u16, body: String },
    /// The platform confirmed the identity no longer exists
    NotFound,
    /// Transient failures persisted past the retry budget
    RetryExhausted { attempts: u32 },
    /// GraphQL error payload or missing node data mid-pagination; raised so
    /// an incomplete relationship set is never reconciled
    PartialFetch(String),
    /// Response body could not be decoded
    ResponseError(String),
}

impl ApiError {
    /// Whether retrying a later cycle could succeed. Entity-fatal (404) and
    /// malformed-request failures are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ApiError::NotFound | ApiError::Client { .. })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e) => write!(f, "Network error: {}", e),
            ApiError::Client { status, body } => {
                write!(f, "Client error: status {}: {}", status, body)
            }
            ApiError::NotFound => write!(f, "Identity not found on the platform"),
            ApiError::RetryExhausted { attempts } => {
                write!(f, "Request failed after {} attempts", attempts)
            }
            ApiError::PartialFetch(msg) => write!(f, "Partial fetch detected: {}", msg),
            ApiError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl Error for ApiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ApiError::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        ApiError::Network(error)
    }
}
