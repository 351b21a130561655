//! The proxy service implementing hyper's `Service` trait.
//!
//! [`ProxyService`] runs every inbound request through the pipeline:
//!
//! 1. Method guard (`405` for anything but GET and HEAD)
//! 2. Normalization (host, canonical path, `x-amz-*` query stripping)
//! 3. Listing guard (`404` unless listing is enabled)
//! 4. Target resolution (backend hostname, rclone rewrite)
//! 5. Header filtering
//! 6. Signing, always as GET
//! 7. Forwarding with range retries
//! 8. Response shaping (empty body for HEAD)
//!
//! The inbound body is never read.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::request::Parts;
use http::{Method, Request, Response};
use hyper::service::Service;
use s3gate_auth::RequestSigner;
use s3gate_core::{
    NormalizedRequest, ProxyConfig, filter_headers, is_listing_request, resolve_target,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::body::ProxyBody;
use crate::error::ProxyError;
use crate::forward::forward;
use crate::response::{
    is_allowed_method, method_not_allowed, not_found, shape_response, status_response,
};

/// Read-only S3 proxy service.
///
/// # Type Parameters
///
/// - `B`: The transport used to reach the object store.
#[derive(Debug)]
pub struct ProxyService<B: Backend> {
    config: Arc<ProxyConfig>,
    signer: Arc<dyn RequestSigner>,
    backend: Arc<B>,
}

impl<B: Backend> ProxyService<B> {
    /// Create a proxy service.
    #[must_use]
    pub fn new(config: Arc<ProxyConfig>, signer: Arc<dyn RequestSigner>, backend: Arc<B>) -> Self {
        Self {
            config,
            signer,
            backend,
        }
    }

    /// The configuration this service was built with.
    #[must_use]
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run one request through the pipeline.
    ///
    /// Guard rejections (`405`, `404`) are returned as `Ok` responses.
    ///
    /// # Errors
    ///
    /// Returns a [`ProxyError`] when the target cannot be resolved, signing
    /// fails, or the backend cannot be reached.
    pub async fn handle(
        &self,
        parts: &Parts,
        request_id: &str,
    ) -> Result<Response<ProxyBody>, ProxyError> {
        if !is_allowed_method(&parts.method) {
            debug!(method = %parts.method, request_id, "rejecting method");
            return Ok(method_not_allowed());
        }

        let normalized = NormalizedRequest::from_parts(parts);

        if !self.config.allow_list_bucket
            && is_listing_request(&self.config.bucket, &normalized.canonical_path)
        {
            debug!(path = %normalized.path, request_id, "blocking bucket listing");
            return Ok(not_found());
        }

        let target = resolve_target(&self.config, &normalized)?;
        let uri = target.backend_uri()?;
        let headers = filter_headers(&parts.headers, &self.config);

        // HEAD is fetched as GET; the shaper drops the body.
        let signed = self.signer.sign(&uri, &Method::GET, &headers)?;
        debug!(
            uri = %signed.uri,
            range = signed.has_range(),
            request_id,
            "forwarding signed request"
        );

        let cancel = CancellationToken::new();
        let response = forward(self.backend.as_ref(), &signed, &cancel).await?;

        Ok(shape_response(parts.method == Method::HEAD, response))
    }
}

impl<B: Backend> Clone for ProxyService<B> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            signer: Arc::clone(&self.signer),
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend, ReqBody> Service<Request<ReqBody>> for ProxyService<B> {
    type Response = Response<ProxyBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<ReqBody>) -> Self::Future {
        let service = self.clone();
        let (parts, _body) = req.into_parts();

        Box::pin(async move {
            let request_id = Uuid::new_v4().to_string();

            let response = match service.handle(&parts, &request_id).await {
                Ok(response) => response,
                Err(err) => error_response(&err, &request_id),
            };

            info!(
                method = %parts.method,
                uri = %parts.uri,
                status = response.status().as_u16(),
                request_id,
                "handled request"
            );
            Ok(response)
        })
    }
}

/// Map a pipeline failure onto an empty-bodied response.
fn error_response(err: &ProxyError, request_id: &str) -> Response<ProxyBody> {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, request_id, "request failed");
    } else {
        warn!(error = %err, request_id, "rejecting request");
    }
    status_response(status)
}
