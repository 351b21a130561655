//! Error types for SigV4 signing.

/// Errors that can occur while signing a backend request.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The credential provider has no usable credentials.
    #[error("no signing credentials available")]
    MissingCredentials,

    /// The target URI has no host to sign for.
    #[error("cannot sign a request without a host: {0}")]
    MissingHost(String),

    /// A header value contains bytes that cannot be canonicalized.
    #[error("header `{0}` has a value that cannot be signed")]
    InvalidHeaderValue(String),

    /// The signed URI could not be assembled.
    #[error("invalid signed URI: {0}")]
    InvalidUri(#[from] http::Error),
}
