//! Backend client, range-retry forwarding, response shaping, and hyper service for s3gate.
//!
//! This crate is the request-time half of the proxy:
//!
//! - **Backend** ([`backend`]): The [`Backend`](backend::Backend) seam and the
//!   reqwest-based [`HttpBackend`](backend::HttpBackend) with cooperative
//!   cancellation.
//!
//! - **Forwarding** ([`forward`]): The range-retry state machine that re-issues
//!   ranged requests the backend answered with a full body.
//!
//! - **Response shaping** ([`response`]): HEAD body stripping and the proxy's own
//!   status responses.
//!
//! - **Service** ([`service`]): [`ProxyService`](service::ProxyService), the hyper
//!   `Service` tying the pipeline together.
//!
//! - **Body** ([`body`]): [`ProxyBody`](body::ProxyBody), streaming, buffered, or
//!   empty.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> ProxyService (hyper Service)
//!     -> method guard / listing guard (s3gate-core)
//!     -> resolve_target + filter_headers (s3gate-core)
//!     -> RequestSigner (s3gate-auth)
//!     -> forward (range retries over Backend)
//!     -> shape_response
//!   <- HTTP Response
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use s3gate_auth::{SigV4Signer, StaticCredentialProvider};
//! use s3gate_core::ProxyConfig;
//! use s3gate_http::{HttpBackend, ProxyService};
//!
//! let config = ProxyConfig::from_env().unwrap();
//! let provider = StaticCredentialProvider::new(&config.access_key_id, &config.secret_access_key);
//! let signer = SigV4Signer::new(Arc::new(provider), config.signing_region());
//! let backend = HttpBackend::new().unwrap();
//! let service = ProxyService::new(Arc::new(config), Arc::new(signer), Arc::new(backend));
//! // Use `service` with hyper server.
//! ```

pub mod backend;
pub mod body;
pub mod error;
pub mod forward;
pub mod response;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{Backend, BackendResponse, HttpBackend};
pub use body::ProxyBody;
pub use error::ProxyError;
pub use forward::{RANGE_RETRY_ATTEMPTS, RetryState, forward};
pub use service::ProxyService;
