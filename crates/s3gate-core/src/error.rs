//! Error types for s3gate core.

/// Errors raised while loading [`ProxyConfig`](crate::ProxyConfig) at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// None of the accepted environment variables for a required setting is set.
    #[error("missing required configuration: {0}")]
    MissingVariable(String),

    /// `BUCKET_NAME` is set but empty.
    #[error("BUCKET_NAME must be `$path`, `$host`, or a bucket name, got an empty value")]
    EmptyBucketName,

    /// The backend endpoint is not a bare hostname.
    #[error("invalid backend endpoint `{0}`: expected a bare hostname such as s3.us-west-004.backblazeb2.com")]
    InvalidEndpoint(String),
}

/// Errors raised while turning a resolved target into a backend URI.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// The inbound host does not yield a usable bucket label in host-style mode.
    #[error("cannot derive a bucket from request host `{0}`")]
    InvalidBucketLabel(String),

    /// The assembled backend URI is not valid.
    #[error("invalid backend URI: {0}")]
    InvalidUri(#[from] http::Error),
}
