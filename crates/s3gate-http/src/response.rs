//! Outbound response construction.
//!
//! [`shape_response`] turns the final backend answer into the client response;
//! the remaining helpers build the proxy's own empty-bodied status responses.

use http::{HeaderValue, Method, Response, StatusCode};

use crate::backend::BackendResponse;
use crate::body::ProxyBody;

/// Methods the proxy serves.
pub const ALLOWED_METHODS: &str = "GET, HEAD";

/// Build the client response from the final backend response.
///
/// HEAD keeps the status and headers and drops the body. Everything else is
/// relayed unmodified, body streamed.
#[must_use]
pub fn shape_response(head: bool, backend: BackendResponse) -> Response<ProxyBody> {
    let BackendResponse {
        status,
        headers,
        body,
        cancel,
    } = backend;

    let body = if head {
        drop(body);
        cancel.cancel();
        ProxyBody::empty()
    } else {
        body
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Whether the proxy serves `method`.
#[must_use]
pub fn is_allowed_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// `405 Method Not Allowed` with an `Allow` header.
#[must_use]
pub fn method_not_allowed() -> Response<ProxyBody> {
    let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
    response
        .headers_mut()
        .insert(http::header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
    response
}

/// `404 Not Found`, returned for blocked bucket listings.
#[must_use]
pub fn not_found() -> Response<ProxyBody> {
    status_response(StatusCode::NOT_FOUND)
}

/// An empty-bodied response with `status`.
#[must_use]
pub fn status_response(status: StatusCode) -> Response<ProxyBody> {
    let mut response = Response::new(ProxyBody::empty());
    *response.status_mut() = status;
    response
}
