//! Bucket-listing detection.

use crate::config::AddressingMode;

/// Whether a request with this canonical path would enumerate a bucket rather
/// than address a specific object.
///
/// In path-style mode the bucket is the first path segment, so anything with
/// fewer than two `/`-delimited segments is a listing (the empty path counts
/// as one segment). In the other modes the bucket comes from the host, so only
/// the empty path is a listing.
///
/// # Examples
///
/// ```
/// use s3gate_core::{AddressingMode, is_listing_request};
///
/// assert!(is_listing_request(&AddressingMode::PathStyle, "bucket"));
/// assert!(!is_listing_request(&AddressingMode::PathStyle, "bucket/key"));
/// assert!(is_listing_request(&AddressingMode::HostStyle, ""));
/// assert!(!is_listing_request(&AddressingMode::HostStyle, "key"));
/// ```
#[must_use]
pub fn is_listing_request(mode: &AddressingMode, canonical_path: &str) -> bool {
    match mode {
        AddressingMode::PathStyle => canonical_path.split('/').count() < 2,
        AddressingMode::HostStyle | AddressingMode::FixedBucket(_) => canonical_path.is_empty(),
    }
}
