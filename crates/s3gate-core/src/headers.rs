//! Inbound header policy.
//!
//! [`filter_headers`] is the only boundary between client-supplied headers and
//! the signed backend request. It runs before signing: anything it lets through
//! is covered by the signature and reaches the backend.

use http::{HeaderMap, HeaderName};

use crate::config::ProxyConfig;

/// Headers that break signing or leak proxy-internal metadata.
pub const UNSIGNABLE_HEADERS: [&str; 8] = [
    "x-forwarded-proto",
    "x-real-ip",
    "accept-encoding",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
];

/// Connection-scoped headers that describe the client hop, not the request.
pub const HOP_BY_HOP_HEADERS: [&str; 7] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Namespace reserved for the edge platform in front of the proxy.
pub const RESERVED_HEADER_PREFIX: &str = "cf-";

/// Whether a single header name may be signed and forwarded.
#[must_use]
pub fn is_forwardable(name: &HeaderName, config: &ProxyConfig) -> bool {
    // HeaderName is always lowercase.
    let name = name.as_str();
    !UNSIGNABLE_HEADERS.contains(&name)
        && !HOP_BY_HOP_HEADERS.contains(&name)
        && !name.starts_with(RESERVED_HEADER_PREFIX)
        && config.header_allowed(name)
}

/// Keep only the headers that may be signed and forwarded.
///
/// Surviving headers keep their relative order, and repeated headers keep every
/// value.
#[must_use]
pub fn filter_headers(headers: &HeaderMap, config: &ProxyConfig) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_forwardable(name, config) {
            filtered.append(name.clone(), value.clone());
        }
    }
    filtered
}
