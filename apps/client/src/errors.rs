use serde::Deserialize;
use thiserror::Error;

/// Why a token refresh did not produce a new credential pair.
///
/// `Clone` so the same failure can be delivered to every request that was
/// queued behind the refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingToken,

    #[error("refresh rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh request failed: {0}")]
    Transport(String),

    #[error("refresh response could not be read: {0}")]
    Malformed(String),

    #[error("refresh timed out after {0}s")]
    TimedOut(u64),

    #[error("refresh was abandoned before it completed")]
    Abandoned,
}

/// Client-level error type returned by the gateway and every API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No usable response: connect, DNS, timeout or body read failure.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Session refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unexpected response shape from {endpoint}: {detail}")]
    UnexpectedShape { endpoint: String, detail: String },

    #[error("Request reported failure: {0}")]
    Unsuccessful(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// True when the caller has to re-authenticate: 401/403 responses and
    /// every failed refresh.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status == 401 || *status == 403,
            ApiError::Refresh(_) => true,
            _ => false,
        }
    }

    pub fn unexpected_shape(endpoint: &str, detail: impl Into<String>) -> Self {
        ApiError::UnexpectedShape {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Message { message: String },
    Nested { error: NestedError },
    Plain { error: String },
}

#[derive(Debug, Deserialize)]
struct NestedError {
    message: String,
}

/// Pulls a human-readable message out of an error response body.
/// Falls back to the raw body text, or the status line when the body is empty.
pub fn error_message(status: u16, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return match parsed {
            ErrorBody::Message { message } => message,
            ErrorBody::Nested { error } => error.message,
            ErrorBody::Plain { error } => error,
        };
    }

    let text = String::from_utf8_lossy(body).trim().to_string();
    if text.is_empty() {
        format!("request failed with status {status}")
    } else {
        text
    }
}
