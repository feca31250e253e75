//! Backend client error types.

use std::fmt;

/// Errors from the backend HTTP client.
#[derive(Debug)]
pub enum BackendError {
    /// HTTP request failed (network error, timeout, etc.)
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// Backend returned an error status code
    Api { status: u16, message: String },

    /// Row or RPC target does not exist
    NotFound,

    /// Rate limited by the backend
    RateLimited,

    /// Missing, expired or insufficient credentials (401/403)
    Unauthorized,

    /// Client could not be built or a request could not be prepared
    InvalidConfig(String),
}

impl BackendError {
    /// Whether the caller's credentials were rejected.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, BackendError::Unauthorized)
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Http(e) => write!(f, "HTTP error: {e}"),
            BackendError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            BackendError::Api { status, message } => {
                write!(f, "backend error {status}: {message}")
            }
            BackendError::NotFound => write!(f, "not found"),
            BackendError::RateLimited => write!(f, "rate limited by backend"),
            BackendError::Unauthorized => write!(f, "unauthorized"),
            BackendError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        BackendError::Http(err)
    }
}
