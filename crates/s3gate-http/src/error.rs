//! Per-request failures.

use http::StatusCode;
use s3gate_auth::SignError;
use s3gate_core::TargetError;

/// Errors that abort a single proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The backend request could not be signed.
    #[error("failed to sign backend request: {0}")]
    Sign(#[from] SignError),

    /// The backend could not be reached or the exchange failed mid-flight.
    #[error("backend request failed: {0}")]
    Backend(String),

    /// The attempt was cancelled before the backend answered.
    #[error("backend request cancelled")]
    Cancelled,

    /// The inbound request does not map onto a backend target.
    #[error("cannot resolve backend target: {0}")]
    InvalidTarget(#[from] TargetError),
}

impl ProxyError {
    /// Status returned to the client for this failure.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Sign(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(_) | Self::Cancelled => StatusCode::BAD_GATEWAY,
            Self::InvalidTarget(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(err.to_string())
    }
}
