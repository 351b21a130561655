//! Forwarding with range-request retries.
//!
//! Some backends occasionally answer a ranged GET with the whole object and a
//! `200 OK`. A client that asked for a few bytes of a large object would then
//! receive all of it, so ranged requests are retried until the backend honours
//! the range or the attempt budget runs out:
//!
//! ```text
//! AttemptPending{n} --content-range--------------> Success
//! AttemptPending{n} --non-2xx--------------------> Success
//! AttemptPending{n} --2xx, no content-range, n>1-> AttemptPending{n-1}
//! AttemptPending{1} --2xx, no content-range------> GiveUp
//! ```
//!
//! Attempts run one after another. The previous attempt is cancelled and
//! dropped before the next one starts. Transport errors are not retried.

use s3gate_auth::SignedRequest;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::{Backend, BackendResponse};
use crate::error::ProxyError;

/// Attempts made for a ranged request before giving up.
pub const RANGE_RETRY_ATTEMPTS: u32 = 3;

/// Progress of a ranged request.
#[derive(Debug)]
pub enum RetryState {
    /// Another attempt is due.
    AttemptPending {
        /// Attempts remaining, including the pending one.
        attempts_left: u32,
    },
    /// The backend honoured the range or returned a non-2xx status.
    Success(BackendResponse),
    /// The budget ran out; the last response is relayed as is.
    GiveUp(BackendResponse),
}

impl RetryState {
    /// The starting state for a ranged request.
    #[must_use]
    pub fn start() -> Self {
        Self::AttemptPending {
            attempts_left: RANGE_RETRY_ATTEMPTS,
        }
    }

    /// Advance the machine with the response to the pending attempt.
    #[must_use]
    pub fn on_response(attempts_left: u32, response: BackendResponse) -> Self {
        if response.has_content_range() {
            if attempts_left < RANGE_RETRY_ATTEMPTS {
                info!(
                    attempt = RANGE_RETRY_ATTEMPTS - attempts_left + 1,
                    "range request honoured after retry"
                );
            }
            return Self::Success(response);
        }

        if !response.status.is_success() {
            return Self::Success(response);
        }

        let remaining = attempts_left.saturating_sub(1);
        warn!(
            status = %response.status,
            attempts_left = remaining,
            "backend ignored range header"
        );

        if remaining == 0 {
            error!(
                attempts = RANGE_RETRY_ATTEMPTS,
                "range request attempts exhausted, relaying full response"
            );
            return Self::GiveUp(response);
        }

        response.abandon();
        Self::AttemptPending {
            attempts_left: remaining,
        }
    }
}

/// Send `request` to `backend`, retrying ranged requests per [`RetryState`].
///
/// Each attempt runs under a fresh child of `cancel`.
///
/// # Errors
///
/// Returns the first [`ProxyError`] the backend reports.
pub async fn forward<B>(
    backend: &B,
    request: &SignedRequest,
    cancel: &CancellationToken,
) -> Result<BackendResponse, ProxyError>
where
    B: Backend + ?Sized,
{
    if !request.has_range() {
        return backend.send(request, cancel.child_token()).await;
    }

    let mut state = RetryState::start();
    loop {
        state = match state {
            RetryState::AttemptPending { attempts_left } => {
                let response = backend.send(request, cancel.child_token()).await?;
                RetryState::on_response(attempts_left, response)
            }
            RetryState::Success(response) | RetryState::GiveUp(response) => return Ok(response),
        };
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue, Method, StatusCode};
    use http_body_util::BodyExt;

    use super::*;
    use crate::testing::{Reply, ScriptedBackend};

    fn signed(range: bool) -> SignedRequest {
        let mut headers = HeaderMap::new();
        if range {
            headers.insert("range", HeaderValue::from_static("bytes=0-9"));
        }
        SignedRequest {
            method: Method::GET,
            uri: "https://bucket.b2.example.com/big.bin".parse().unwrap(),
            headers,
        }
    }

    async fn body_of(response: BackendResponse) -> String {
        let bytes = response.body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_should_succeed_on_first_partial_response() {
        let backend = ScriptedBackend::new([Reply::partial("0123456789")]);

        let response = forward(&backend, &signed(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_of(response).await, "0123456789");
    }

    #[tokio::test]
    async fn test_should_retry_until_range_is_honoured() {
        let backend = ScriptedBackend::new([
            Reply::ok("full-1"),
            Reply::ok("full-2"),
            Reply::partial("0123456789"),
        ]);

        let response = forward(&backend, &signed(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.calls(), 3);
        assert_eq!(response.status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body_of(response).await, "0123456789");

        let tokens = backend.tokens();
        assert!(tokens[0].is_cancelled());
        assert!(tokens[1].is_cancelled());
        assert!(!tokens[2].is_cancelled());
    }

    #[tokio::test]
    async fn test_should_give_up_after_three_full_responses() {
        let backend = ScriptedBackend::new([
            Reply::ok("full-1"),
            Reply::ok("full-2"),
            Reply::ok("full-3"),
            Reply::partial("never reached"),
        ]);

        let response = forward(&backend, &signed(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.calls(), 3);
        assert_eq!(response.status, StatusCode::OK);
        assert!(!response.cancel.is_cancelled());
        assert_eq!(body_of(response).await, "full-3");
    }

    #[tokio::test]
    async fn test_should_not_retry_non_success_status() {
        let backend = ScriptedBackend::new([
            Reply::status(StatusCode::RANGE_NOT_SATISFIABLE),
            Reply::partial("never reached"),
        ]);

        let response = forward(&backend, &signed(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(response.status, StatusCode::RANGE_NOT_SATISFIABLE);
    }

    #[tokio::test]
    async fn test_should_send_once_without_range_header() {
        let backend = ScriptedBackend::new([Reply::ok("whole"), Reply::ok("again")]);

        let response = forward(&backend, &signed(false), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(backend.calls(), 1);
        assert_eq!(body_of(response).await, "whole");
    }

    #[tokio::test]
    async fn test_should_not_retry_transport_errors() {
        let backend = ScriptedBackend::new([Reply::Fail, Reply::partial("never reached")]);

        let result = forward(&backend, &signed(true), &CancellationToken::new()).await;

        assert!(matches!(result, Err(ProxyError::Backend(_))));
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_should_run_attempts_under_child_tokens() {
        let parent = CancellationToken::new();
        let backend = ScriptedBackend::new([Reply::ok("full")]);

        forward(&backend, &signed(false), &parent).await.unwrap();
        parent.cancel();

        assert!(backend.tokens()[0].is_cancelled());
    }

    #[test]
    fn test_should_start_with_full_budget() {
        assert!(matches!(
            RetryState::start(),
            RetryState::AttemptPending {
                attempts_left: RANGE_RETRY_ATTEMPTS
            }
        ));
    }
}
