//! Inbound request normalization.
//!
//! Turns raw request parts into a [`NormalizedRequest`]:
//!
//! - the backend scheme is pinned to [`BACKEND_SCHEME`] on its default port;
//!   the inbound scheme and port are never carried over,
//! - every query parameter whose name starts with `x-amz-` (any case) is
//!   dropped so a pre-signed URL cannot collide with the proxy's own signature,
//! - the path is reduced to a canonical relative path by removing a single
//!   leading and a single trailing slash.
//!
//! Normalization is total: every input produces a value.

use http::{HeaderMap, Uri};
use percent_encoding::percent_decode_str;

/// Scheme used for every backend request.
pub const BACKEND_SCHEME: &str = "https";

/// Query parameter name prefix reserved for request signatures.
pub const SIGNATURE_QUERY_PREFIX: &str = "x-amz-";

/// An inbound request after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    /// The host the client addressed, without any port.
    pub host: String,
    /// The raw inbound pathname, always starting with `/`.
    pub path: String,
    /// The path with one leading and one trailing slash removed.
    pub canonical_path: String,
    /// The raw query string with signature parameters removed. `None` when
    /// nothing remains.
    pub query: Option<String>,
}

impl NormalizedRequest {
    /// Normalize the parts of an inbound request.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self::new(&request_host(&parts.headers, &parts.uri), &parts.uri)
    }

    /// Normalize a request URI addressed to `host`.
    #[must_use]
    pub fn new(host: &str, uri: &Uri) -> Self {
        let path = match uri.path() {
            "" => "/".to_owned(),
            p => p.to_owned(),
        };
        let canonical_path = canonical_path(&path).to_owned();

        Self {
            host: strip_port(host).to_owned(),
            path,
            canonical_path,
            query: uri.query().and_then(strip_signature_params),
        }
    }
}

/// Remove a single leading and a single trailing slash.
///
/// # Examples
///
/// ```
/// use s3gate_core::normalize::canonical_path;
///
/// assert_eq!(canonical_path("/bucket/key.txt"), "bucket/key.txt");
/// assert_eq!(canonical_path("/bucket/dir/"), "bucket/dir");
/// assert_eq!(canonical_path("//double//"), "/double/");
/// assert_eq!(canonical_path("/"), "");
/// ```
#[must_use]
pub fn canonical_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path)
}

/// Drop every query parameter whose percent-decoded name starts with
/// [`SIGNATURE_QUERY_PREFIX`], case-insensitively.
///
/// Surviving parameters keep their raw encoding and order. Returns `None` when
/// no parameter survives.
///
/// # Examples
///
/// ```
/// use s3gate_core::normalize::strip_signature_params;
///
/// assert_eq!(
///     strip_signature_params("X-Amz-Signature=abc&versionId=3&x-amz-date=1"),
///     Some("versionId=3".to_owned()),
/// );
/// assert_eq!(strip_signature_params("X-Amz-Expires=60"), None);
/// ```
#[must_use]
pub fn strip_signature_params(query: &str) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| !is_signature_param(pair))
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("&"))
    }
}

fn is_signature_param(pair: &str) -> bool {
    let raw_name = pair.split_once('=').map_or(pair, |(name, _)| name);
    let name = percent_decode_str(raw_name).decode_utf8_lossy();
    name.get(..SIGNATURE_QUERY_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SIGNATURE_QUERY_PREFIX))
}

/// The host the client addressed: the `Host` header, falling back to the URI
/// authority (HTTP/2 `:authority`). Empty when neither is present.
#[must_use]
pub fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(http::uri::Authority::as_str))
        .unwrap_or_default()
        .to_owned()
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literals keep their colons.
    if let Some(end) = host.strip_prefix('[').and_then(|rest| rest.find(']')) {
        return &host[..end + 2];
    }
    host.split(':').next().unwrap_or(host)
}
