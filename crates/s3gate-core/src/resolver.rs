//! Backend target resolution.
//!
//! Maps a [`NormalizedRequest`] onto the backend: which host to contact and
//! which object path to request. The hostname always has exactly one of three
//! shapes, picked by the configured [`AddressingMode`]:
//!
//! | Mode | Hostname |
//! |------|----------|
//! | `PathStyle` | `<endpoint>` |
//! | `HostStyle` | `<first label of request host>.<endpoint>` |
//! | `FixedBucket(name)` | `<name>.<endpoint>` |

use http::Uri;
use http::uri::PathAndQuery;

use crate::config::{AddressingMode, ProxyConfig};
use crate::error::TargetError;
use crate::normalize::{BACKEND_SCHEME, NormalizedRequest};
use crate::rewrite::rewrite_rclone_path;

/// Where a request goes on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Backend hostname.
    pub hostname: String,
    /// Absolute object path sent to the backend, after any rclone rewrite.
    pub path: String,
    /// Query string forwarded to the backend, signature parameters removed.
    pub query: Option<String>,
}

impl ResolvedTarget {
    /// The absolute `https://` URI for this target. Port 443 is implied by the
    /// scheme and never written.
    pub fn backend_uri(&self) -> Result<Uri, TargetError> {
        let path_and_query: PathAndQuery = match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
        .parse()
        .map_err(|e: http::uri::InvalidUri| TargetError::InvalidUri(e.into()))?;

        Ok(Uri::builder()
            .scheme(BACKEND_SCHEME)
            .authority(self.hostname.as_str())
            .path_and_query(path_and_query)
            .build()?)
    }
}

/// Compute the backend hostname for `mode`.
///
/// # Examples
///
/// ```
/// use s3gate_core::{AddressingMode, resolve_hostname};
///
/// let endpoint = "b2.example.com";
/// assert_eq!(
///     resolve_hostname(&AddressingMode::HostStyle, endpoint, "mybucket.proxy.example.com"),
///     "mybucket.b2.example.com",
/// );
/// ```
#[must_use]
pub fn resolve_hostname(mode: &AddressingMode, endpoint: &str, request_host: &str) -> String {
    match mode {
        AddressingMode::PathStyle => endpoint.to_owned(),
        AddressingMode::HostStyle => format!("{}.{endpoint}", first_label(request_host)),
        AddressingMode::FixedBucket(bucket) => format!("{bucket}.{endpoint}"),
    }
}

/// Resolve the backend target for a normalized request.
///
/// When `rclone_download` is enabled the object path is the canonical path with
/// the rclone prefix stripped; otherwise the inbound pathname is forwarded as
/// received, trailing slash included, so folder-marker keys stay reachable.
///
/// # Errors
///
/// Returns [`TargetError::InvalidBucketLabel`] in host-style mode when the
/// request host does not start with a usable bucket label.
pub fn resolve_target(
    config: &ProxyConfig,
    request: &NormalizedRequest,
) -> Result<ResolvedTarget, TargetError> {
    if config.bucket == AddressingMode::HostStyle && !is_bucket_label(first_label(&request.host)) {
        return Err(TargetError::InvalidBucketLabel(request.host.clone()));
    }

    let hostname = resolve_hostname(&config.bucket, &config.endpoint, &request.host);

    let path = if config.rclone_download {
        format!(
            "/{}",
            rewrite_rclone_path(&config.bucket, &request.canonical_path)
        )
    } else {
        request.path.clone()
    };

    Ok(ResolvedTarget {
        hostname,
        path,
        query: request.query.clone(),
    })
}

fn first_label(host: &str) -> &str {
    host.split('.').next().unwrap_or(host)
}

/// Bucket names are DNS labels; anything else cannot be turned into a backend host.
fn is_bucket_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
