//! Canonical request construction for AWS Signature Version 4.
//!
//! This module implements the canonical request format as specified by AWS:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! The signer builds the canonical URI and query once and sends exactly those
//! to the backend, so the bytes on the wire and the bytes signed never diverge.

use http::{HeaderMap, HeaderName};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, percent_encode};

use crate::error::SignError;

/// The set of characters that must be percent-encoded in URI path segments.
///
/// AWS SigV4 requires all characters except unreserved characters
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`) must be encoded.
/// Forward slashes in the path are preserved (not encoded).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A canonical request and the header list it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// The newline-separated canonical request text.
    pub text: String,
    /// Semicolon-separated, sorted, lowercase signed header names.
    pub signed_headers: String,
}

/// Build the canonical request for `headers`, signing every header whose name
/// `is_signed` accepts.
///
/// `canonical_uri` and `canonical_query` are used verbatim; build them with
/// [`build_canonical_uri`] and [`build_canonical_query_string`].
///
/// Repeated headers are folded into one comma-separated line, values are
/// trimmed, and inner whitespace runs collapse to a single space.
///
/// # Errors
///
/// Returns [`SignError::InvalidHeaderValue`] if a signed header value is not
/// visible ASCII.
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &HeaderMap,
    is_signed: impl Fn(&HeaderName) -> bool,
    payload_hash: &str,
) -> Result<CanonicalRequest, SignError> {
    let mut names: Vec<&HeaderName> = headers.keys().filter(|name| is_signed(name)).collect();
    names.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));

    let mut lines = Vec::with_capacity(names.len());
    for name in &names {
        let values = headers
            .get_all(*name)
            .iter()
            .map(|v| {
                v.to_str()
                    .map(|s| collapse_whitespace(s.trim()))
                    .map_err(|_| SignError::InvalidHeaderValue(name.as_str().to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        lines.push(format!("{}:{}", name.as_str(), values.join(",")));
    }

    let signed_headers = names
        .iter()
        .map(|n| n.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let canonical_headers = lines.join("\n");

    Ok(CanonicalRequest {
        text: format!(
            "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n\n{signed_headers}\n{payload_hash}"
        ),
        signed_headers,
    })
}

/// Build the canonical URI by URI-encoding each path segment individually.
///
/// Forward slashes (`/`) are preserved. Empty paths are normalized to `/`.
/// Segments are decoded before encoding, so an already percent-encoded path
/// is not double-encoded.
///
/// # Examples
///
/// ```
/// use s3gate_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("/test.txt"), "/test.txt");
/// assert_eq!(build_canonical_uri("/a b/c%20d"), "/a%20b/c%20d");
/// assert_eq!(build_canonical_uri(""), "/");
/// ```
#[must_use]
pub fn build_canonical_uri(path: &str) -> String {
    if path.is_empty() || path == "/" {
        return "/".to_owned();
    }

    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Build the canonical query string.
///
/// Every name and value is decoded and re-encoded with the unreserved set,
/// then the pairs are sorted by encoded name first, then by encoded value.
/// Valueless parameters get an empty value. The result is also a valid query
/// string, and the signer sends it in place of the client's.
///
/// # Examples
///
/// ```
/// use s3gate_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(build_canonical_query_string("b=2&a=1&versioning"), "a=1&b=2&versioning=");
/// assert_eq!(build_canonical_query_string("prefix=a/b"), "prefix=a%2Fb");
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    let mut params: Vec<(String, String)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (uri_encode(key), uri_encode(value))
        })
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-decode `raw` to bytes and re-encode everything but unreserved
/// characters. Invalid escapes pass through as literal `%` and are encoded.
fn uri_encode(raw: &str) -> String {
    let bytes: Vec<u8> = percent_decode_str(raw).collect();
    percent_encode(&bytes, URI_ENCODE_SET).to_string()
}

/// Collapse consecutive whitespace characters in a string to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    const EMPTY_HASH: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn header_map(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_should_encode_special_characters_in_path() {
        assert_eq!(build_canonical_uri("/hello world"), "/hello%20world");
        assert_eq!(build_canonical_uri("/a+b/(c)"), "/a%2Bb/%28c%29");
    }

    #[test]
    fn test_should_not_double_encode_uri_path() {
        assert_eq!(build_canonical_uri("/hello%20world"), "/hello%20world");
        assert_eq!(
            build_canonical_uri("/hello world"),
            build_canonical_uri("/hello%20world")
        );
    }

    #[test]
    fn test_should_preserve_trailing_slash() {
        assert_eq!(build_canonical_uri("/bucket/dir/"), "/bucket/dir/");
    }

    #[test]
    fn test_should_keep_non_utf8_escapes_byte_for_byte() {
        assert_eq!(build_canonical_uri("/bucket/%FF%fe.bin"), "/bucket/%FF%FE.bin");
        assert_eq!(build_canonical_query_string("k=%ff"), "k=%FF");
    }

    #[test]
    fn test_should_encode_slash_in_query_values() {
        assert_eq!(
            build_canonical_query_string("list-type=2&delimiter=/&prefix=photos/"),
            "delimiter=%2F&list-type=2&prefix=photos%2F"
        );
    }

    #[test]
    fn test_should_normalize_query_escapes() {
        assert_eq!(build_canonical_query_string("v=%7E"), "v=~");
        assert_eq!(build_canonical_query_string("v=a%2fb"), "v=a%2Fb");
        assert_eq!(build_canonical_query_string("a%20b=c d"), "a%20b=c%20d");
        assert_eq!(
            build_canonical_query_string("delimiter=/"),
            build_canonical_query_string("delimiter=%2F")
        );
    }

    #[test]
    fn test_should_sort_query_parameters() {
        assert_eq!(build_canonical_query_string("b=2&a=1&c=3"), "a=1&b=2&c=3");
        assert_eq!(build_canonical_query_string(""), "");
    }

    #[test]
    fn test_should_sort_duplicate_query_keys_by_value() {
        assert_eq!(
            build_canonical_query_string("k=2&k=1&a=%2F"),
            "a=%2F&k=1&k=2"
        );
    }

    #[test]
    fn test_should_fold_repeated_headers_and_collapse_whitespace() {
        let headers = header_map(&[
            ("x-custom", "  a   b  "),
            ("host", "example.com"),
            ("x-custom", "c"),
        ]);
        let canonical =
            build_canonical_request("GET", "/", "", &headers, |_| true, EMPTY_HASH).unwrap();
        assert!(canonical.text.contains("host:example.com\nx-custom:a b,c\n\n"));
        assert_eq!(canonical.signed_headers, "host;x-custom");
    }

    #[test]
    fn test_should_skip_unsigned_headers() {
        let headers = header_map(&[("host", "example.com"), ("user-agent", "curl/8")]);
        let canonical = build_canonical_request(
            "GET",
            "/",
            "",
            &headers,
            |name| name != "user-agent",
            EMPTY_HASH,
        )
        .unwrap();
        assert_eq!(canonical.signed_headers, "host");
        assert!(!canonical.text.contains("curl"));
    }

    #[test]
    fn test_should_reject_non_ascii_header_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-custom",
            HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap(),
        );
        let result = build_canonical_request("GET", "/", "", &headers, |_| true, EMPTY_HASH);
        assert!(matches!(result, Err(SignError::InvalidHeaderValue(name)) if name == "x-custom"));
    }

    #[test]
    fn test_should_build_canonical_request_matching_aws_example() {
        use sha2::{Digest, Sha256};

        // AWS test vector: GET /test.txt from examplebucket
        let headers = header_map(&[
            ("host", "examplebucket.s3.amazonaws.com"),
            ("range", "bytes=0-9"),
            ("x-amz-content-sha256", EMPTY_HASH),
            ("x-amz-date", "20130524T000000Z"),
        ]);

        let canonical =
            build_canonical_request("GET", "/test.txt", "", &headers, |_| true, EMPTY_HASH)
                .unwrap();

        let expected = "GET\n\
                        /test.txt\n\
                        \n\
                        host:examplebucket.s3.amazonaws.com\n\
                        range:bytes=0-9\n\
                        x-amz-content-sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n\
                        x-amz-date:20130524T000000Z\n\
                        \n\
                        host;range;x-amz-content-sha256;x-amz-date\n\
                        e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert_eq!(canonical.text, expected);

        let hash = hex::encode(Sha256::digest(canonical.text.as_bytes()));
        assert_eq!(
            hash,
            "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972"
        );
    }
}
