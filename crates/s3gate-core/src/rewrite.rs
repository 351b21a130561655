//! The rclone download path convention.
//!
//! rclone's `serve`/download links put objects under `file/<bucket>/<key>`.
//! When `RCLONE_DOWNLOAD=true` that prefix is removed from the object path
//! before signing. Only the path sent to the backend changes; listing
//! detection and bucket resolution still see the original canonical path.

use crate::config::AddressingMode;

/// The literal first segment of rclone download paths.
pub const RCLONE_PREFIX: &str = "file/";

/// Strip the rclone download prefix from a canonical path.
///
/// - Path-style: a leading `file/` is removed, leaving `<bucket>/<key>`.
/// - Other modes: a leading `file/<segment>/` is removed; the middle segment
///   (conventionally the bucket name) is discarded because the bucket comes
///   from the host.
///
/// Paths without the prefix are returned unchanged.
///
/// # Examples
///
/// ```
/// use s3gate_core::{AddressingMode, rewrite_rclone_path};
///
/// assert_eq!(
///     rewrite_rclone_path(&AddressingMode::PathStyle, "file/reports/q1.csv"),
///     "reports/q1.csv",
/// );
/// assert_eq!(
///     rewrite_rclone_path(&AddressingMode::HostStyle, "file/mybucket/reports/q1.csv"),
///     "reports/q1.csv",
/// );
/// ```
#[must_use]
pub fn rewrite_rclone_path<'a>(mode: &AddressingMode, path: &'a str) -> &'a str {
    let Some(rest) = path.strip_prefix(RCLONE_PREFIX) else {
        return path;
    };

    match mode {
        AddressingMode::PathStyle => rest,
        AddressingMode::HostStyle | AddressingMode::FixedBucket(_) => match rest.split_once('/') {
            Some((segment, key)) if !segment.is_empty() => key,
            _ => path,
        },
    }
}
