//! Configuration, request normalization, bucket resolution, and header policy for s3gate.
//!
//! This crate holds every decision the proxy makes about an inbound request
//! before anything is signed or sent to the backend:
//!
//! - [`config`] - [`ProxyConfig`] and the closed [`AddressingMode`] enum, built once
//!   from environment variables at startup
//! - [`normalize`] - Scheme/port pinning, `x-amz-*` query stripping, canonical path
//! - [`listing`] - Decides whether a request would enumerate a bucket
//! - [`resolver`] - Backend hostname and object path for the three addressing modes
//! - [`rewrite`] - The rclone `file/` download prefix rewrite
//! - [`headers`] - The header filter that decides what is safe to sign and forward
//!
//! # Pipeline
//!
//! ```text
//! inbound request
//!   -> NormalizedRequest::from_parts
//!   -> is_listing_request (404 unless ALLOW_LIST_BUCKET)
//!   -> resolve_target (hostname + optional rclone rewrite)
//!   -> filter_headers
//!   -> (signer, see s3gate-auth)
//! ```

pub mod config;
pub mod error;
pub mod headers;
pub mod listing;
pub mod normalize;
pub mod resolver;
pub mod rewrite;

pub use config::{AddressingMode, ProxyConfig};
pub use error::{ConfigError, TargetError};
pub use headers::filter_headers;
pub use listing::is_listing_request;
pub use normalize::NormalizedRequest;
pub use resolver::{ResolvedTarget, resolve_hostname, resolve_target};
pub use rewrite::rewrite_rclone_path;
