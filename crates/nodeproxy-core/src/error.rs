//! Request-level error type.
//!
//! Per-node mutation failures are not errors at this level; they are
//! recorded in [`crate::mutation::NodeOutcome`] and counted in the summary.

use thiserror::Error;

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Errors that fail a whole proxy request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Non-success response on the node collection read, forwarded verbatim.
    #[error("Upstream returned HTTP {status}")]
    Upstream { status: u16, body: String },

    /// The error never carries the request URL, which holds the API key.
    #[error("Error processing request: {0}")]
    Transport(reqwest::Error),

    #[error("Error processing request: {0}")]
    Decode(String),

    #[error("Error processing request: invalid upstream URL: {0}")]
    Url(#[from] url::ParseError),

    /// The caller gave up before the request finished.
    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

impl ProxyError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// HTTP-equivalent status for the caller.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingParameter(_) | Self::InvalidParameter { .. } => 400,
            Self::Upstream { status, .. } => *status,
            Self::Transport(_) | Self::Decode(_) | Self::Url(_) => 500,
            Self::Cancelled => 499,
        }
    }

    /// Response body for the caller. Upstream bodies pass through unchanged.
    pub fn body(&self) -> String {
        match self {
            Self::Upstream { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_) | Self::InvalidParameter { .. }
        )
    }
}
