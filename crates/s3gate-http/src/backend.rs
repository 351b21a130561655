//! Backend transport.
//!
//! The [`Backend`] trait is the seam between the forwarder and the network.
//! [`HttpBackend`] is the reqwest implementation used in production; tests
//! plug in scripted backends instead.

use std::fmt;
use std::io;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use http::{HeaderMap, StatusCode};
use s3gate_auth::SignedRequest;
use s3gate_core::headers::HOP_BY_HOP_HEADERS;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::body::ProxyBody;
use crate::error::ProxyError;

/// A backend answer, headers received and body still in flight.
#[derive(Debug)]
pub struct BackendResponse {
    /// Backend status code.
    pub status: StatusCode,
    /// Backend headers, hop-by-hop headers removed.
    pub headers: HeaderMap,
    /// Backend body.
    pub body: ProxyBody,
    /// Token governing the attempt that produced this response.
    pub cancel: CancellationToken,
}

impl BackendResponse {
    /// Create a response governed by a fresh token.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: ProxyBody) -> Self {
        Self {
            status,
            headers,
            body,
            cancel: CancellationToken::new(),
        }
    }

    /// Whether the backend answered a range request with a partial body.
    #[must_use]
    pub fn has_content_range(&self) -> bool {
        self.headers.contains_key(http::header::CONTENT_RANGE)
    }

    /// Cancel the attempt and release its connection.
    pub fn abandon(self) {
        self.cancel.cancel();
    }
}

/// Sends signed requests to the object store.
#[async_trait]
pub trait Backend: Send + Sync + fmt::Debug + 'static {
    /// Send `request`, giving up as soon as `cancel` fires.
    ///
    /// The returned response carries `cancel`; its body stops yielding chunks
    /// once the token is cancelled.
    async fn send(
        &self,
        request: &SignedRequest,
        cancel: CancellationToken,
    ) -> Result<BackendResponse, ProxyError>;
}

/// Backend reached over HTTPS with a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build a client that never follows redirects, so a backend redirect is
    /// relayed to the caller instead of being re-sent with stale signatures.
    pub fn new() -> Result<Self, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn send(
        &self,
        request: &SignedRequest,
        cancel: CancellationToken,
    ) -> Result<BackendResponse, ProxyError> {
        let pending = self
            .client
            .request(request.method.clone(), request.uri.to_string())
            .headers(request.headers.clone())
            .send();

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ProxyError::Cancelled),
            result = pending => result?,
        };

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);
        debug!(%status, uri = %request.uri, "backend responded");

        let body = response
            .bytes_stream()
            .map_err(io::Error::other)
            .take_until(cancel.clone().cancelled_owned());

        Ok(BackendResponse {
            status,
            headers,
            body: ProxyBody::streaming(body),
            cancel,
        })
    }
}

/// Remove headers that describe the backend connection rather than the object.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
