//! Proxy configuration.
//!
//! Provides [`ProxyConfig`], the single read-only configuration value shared by
//! every request. It is built once at startup from environment variables via
//! [`ProxyConfig::from_env`] and passed by reference into each component;
//! nothing reads the environment after that.

use std::fmt;
use std::str::FromStr;

use tracing::debug;
use typed_builder::TypedBuilder;

use crate::error::ConfigError;

/// Default bind address for the proxy listener.
pub const DEFAULT_GATEWAY_LISTEN: &str = "0.0.0.0:8080";

/// Region used for signing when none is configured and none can be derived.
pub const DEFAULT_REGION: &str = "us-east-1";

/// How the backend bucket is derived for a request.
///
/// Decided once when `BUCKET_NAME` is parsed; per-request code only matches on
/// the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressingMode {
    /// `BUCKET_NAME=$path`: the bucket is the first path segment and the
    /// hostname is the bare endpoint.
    PathStyle,
    /// `BUCKET_NAME=$host`: the bucket is the first label of the host the
    /// client used to reach the proxy.
    HostStyle,
    /// Any other value: every request goes to this one bucket.
    FixedBucket(String),
}

impl AddressingMode {
    /// Sentinel selecting [`AddressingMode::PathStyle`].
    pub const PATH_SENTINEL: &str = "$path";
    /// Sentinel selecting [`AddressingMode::HostStyle`].
    pub const HOST_SENTINEL: &str = "$host";
}

impl FromStr for AddressingMode {
    type Err = ConfigError;

    /// Unrecognized values fall through to [`AddressingMode::FixedBucket`] with
    /// the raw string as the bucket name, which keeps existing deployments that
    /// set `BUCKET_NAME` to a literal bucket working.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            Self::PATH_SENTINEL => Ok(Self::PathStyle),
            Self::HOST_SENTINEL => Ok(Self::HostStyle),
            "" => Err(ConfigError::EmptyBucketName),
            bucket => Ok(Self::FixedBucket(bucket.to_owned())),
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathStyle => f.write_str(Self::PATH_SENTINEL),
            Self::HostStyle => f.write_str(Self::HOST_SENTINEL),
            Self::FixedBucket(bucket) => f.write_str(bucket),
        }
    }
}

/// Proxy configuration.
///
/// # Examples
///
/// ```
/// use s3gate_core::config::{AddressingMode, ProxyConfig};
///
/// let config = ProxyConfig::builder()
///     .bucket(AddressingMode::PathStyle)
///     .endpoint("s3.us-west-004.backblazeb2.com")
///     .access_key_id("AKID")
///     .secret_access_key("secret")
///     .build();
/// assert_eq!(config.gateway_listen, "0.0.0.0:8080");
/// assert!(!config.allow_list_bucket);
/// ```
#[derive(Clone, TypedBuilder)]
pub struct ProxyConfig {
    /// Bind address for the listener (e.g. `"0.0.0.0:8080"`).
    #[builder(default = String::from(DEFAULT_GATEWAY_LISTEN), setter(into))]
    pub gateway_listen: String,

    /// Bucket addressing mode, from `BUCKET_NAME`.
    pub bucket: AddressingMode,

    /// Backend endpoint hostname, e.g. `s3.us-west-004.backblazeb2.com`.
    #[builder(setter(into))]
    pub endpoint: String,

    /// Access key id used for signing.
    #[builder(setter(into))]
    pub access_key_id: String,

    /// Secret key used for signing. Never logged.
    #[builder(setter(into))]
    pub secret_access_key: String,

    /// Optional session token for temporary credentials.
    #[builder(default, setter(strip_option, into))]
    pub session_token: Option<String>,

    /// Explicit signing region. Derived from the endpoint when unset.
    #[builder(default, setter(strip_option, into))]
    pub region: Option<String>,

    /// Lowercase header names that may pass the header filter. `None` means
    /// no allow-list is configured.
    #[builder(default, setter(strip_option))]
    pub allowed_headers: Option<Vec<String>>,

    /// Whether listing-style requests are passed through to the backend.
    #[builder(default = false)]
    pub allow_list_bucket: bool,

    /// Whether the rclone `file/` download prefix is stripped from paths.
    #[builder(default = false)]
    pub rclone_download: bool,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"), setter(into))]
    pub log_level: String,
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("region", &self.region)
            .field("allowed_headers", &self.allowed_headers)
            .field("allow_list_bucket", &self.allow_list_bucket)
            .field("rclone_download", &self.rclone_download)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BUCKET_NAME` | *(required)* |
    /// | `B2_ENDPOINT` or `S3_ENDPOINT` | *(required)* |
    /// | `B2_APPLICATION_KEY_ID` or `AWS_ACCESS_KEY_ID` | *(required)* |
    /// | `B2_APPLICATION_KEY` or `AWS_SECRET_ACCESS_KEY` | *(required)* |
    /// | `AWS_SESSION_TOKEN` | *(unset)* |
    /// | `S3_REGION` or `AWS_REGION` | derived from the endpoint |
    /// | `ALLOWED_HEADERS` | *(unset)* |
    /// | `ALLOW_LIST_BUCKET` | `false` |
    /// | `RCLONE_DOWNLOAD` | `false` |
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `LOG_LEVEL` | `info` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// [`ProxyConfig::from_env`] delegates here with `std::env::var`; tests pass
    /// a map lookup instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bucket: AddressingMode = lookup("BUCKET_NAME")
            .ok_or_else(|| ConfigError::MissingVariable("BUCKET_NAME".to_owned()))?
            .parse()?;
        if let AddressingMode::FixedBucket(name) = &bucket {
            debug!(bucket = %name, "BUCKET_NAME is not a sentinel, serving a fixed bucket");
        }
        let endpoint = parse_endpoint(&required(&lookup, &["B2_ENDPOINT", "S3_ENDPOINT"])?)?;
        let access_key_id = required(&lookup, &["B2_APPLICATION_KEY_ID", "AWS_ACCESS_KEY_ID"])?;
        let secret_access_key = required(&lookup, &["B2_APPLICATION_KEY", "AWS_SECRET_ACCESS_KEY"])?;

        Ok(Self {
            gateway_listen: first_of(&lookup, &["GATEWAY_LISTEN"])
                .unwrap_or_else(|| DEFAULT_GATEWAY_LISTEN.to_owned()),
            bucket,
            endpoint,
            access_key_id,
            secret_access_key,
            session_token: first_of(&lookup, &["AWS_SESSION_TOKEN"]),
            region: first_of(&lookup, &["S3_REGION", "AWS_REGION"]),
            allowed_headers: lookup("ALLOWED_HEADERS").map(|v| parse_header_list(&v)),
            allow_list_bucket: lookup("ALLOW_LIST_BUCKET").is_some_and(|v| is_literal_true(&v)),
            rclone_download: lookup("RCLONE_DOWNLOAD").is_some_and(|v| is_literal_true(&v)),
            log_level: first_of(&lookup, &["LOG_LEVEL"]).unwrap_or_else(|| "info".to_owned()),
        })
    }

    /// The region used in the SigV4 credential scope.
    ///
    /// Uses the configured region when present, otherwise derives it from an
    /// endpoint shaped like `s3.<region>.<domain>` (the shape used by Backblaze
    /// B2 and AWS regional endpoints), otherwise [`DEFAULT_REGION`].
    #[must_use]
    pub fn signing_region(&self) -> String {
        if let Some(region) = &self.region {
            return region.clone();
        }
        region_from_endpoint(&self.endpoint).unwrap_or_else(|| DEFAULT_REGION.to_owned())
    }

    /// Whether `name` passes the configured allow-list. Always true when no
    /// allow-list is configured.
    #[must_use]
    pub fn header_allowed(&self, name: &str) -> bool {
        self.allowed_headers
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|a| a.eq_ignore_ascii_case(name)))
    }
}

/// Return the first non-empty value among `names`.
fn first_of<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|&name| lookup(name))
        .find(|v| !v.is_empty())
}

fn required<F>(lookup: &F, names: &[&str]) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    first_of(lookup, names).ok_or_else(|| ConfigError::MissingVariable(names.join(" or ")))
}

/// Accept only a bare hostname: no scheme, no path, no port.
fn parse_endpoint(value: &str) -> Result<String, ConfigError> {
    let endpoint = value.trim().trim_end_matches('.');
    let valid = !endpoint.is_empty()
        && endpoint
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.');
    if valid {
        Ok(endpoint.to_ascii_lowercase())
    } else {
        Err(ConfigError::InvalidEndpoint(value.to_owned()))
    }
}

fn region_from_endpoint(endpoint: &str) -> Option<String> {
    let mut labels = endpoint.split('.');
    if labels.next()? != "s3" {
        return None;
    }
    let region = labels.next()?;
    // Need at least one more label so that `s3.amazonaws.com` does not yield "amazonaws".
    labels.next()?;
    labels.next()?;
    Some(region.to_owned())
}

/// Parse a comma-separated header allow-list into lowercase names.
fn parse_header_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Boolean options are enabled only by the exact string `"true"`.
fn is_literal_true(value: &str) -> bool {
    value == "true"
}
