//! Scripted in-memory backend for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};
use s3gate_auth::SignedRequest;
use tokio_util::sync::CancellationToken;

use crate::backend::{Backend, BackendResponse};
use crate::body::ProxyBody;
use crate::error::ProxyError;

/// One canned backend answer.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Respond {
        status: StatusCode,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    },
    Fail,
}

impl Reply {
    pub(crate) fn ok(body: &'static str) -> Self {
        Self::Respond {
            status: StatusCode::OK,
            headers: vec![("etag", "\"e\"")],
            body,
        }
    }

    pub(crate) fn partial(body: &'static str) -> Self {
        Self::Respond {
            status: StatusCode::PARTIAL_CONTENT,
            headers: vec![("content-range", "bytes 0-9/100"), ("etag", "\"e\"")],
            body,
        }
    }

    pub(crate) fn status(status: StatusCode) -> Self {
        Self::Respond {
            status,
            headers: Vec::new(),
            body: "",
        }
    }
}

/// Answers from a fixed script and records every request it sees.
#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<(SignedRequest, CancellationToken)>>,
}

impl ScriptedBackend {
    pub(crate) fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<SignedRequest> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(req, _)| req.clone())
            .collect()
    }

    pub(crate) fn tokens(&self) -> Vec<CancellationToken> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn send(
        &self,
        request: &SignedRequest,
        cancel: CancellationToken,
    ) -> Result<BackendResponse, ProxyError> {
        self.seen
            .lock()
            .unwrap()
            .push((request.clone(), cancel.clone()));

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Respond {
                status,
                headers,
                body,
            }) => {
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    map.append(name, HeaderValue::from_static(value));
                }
                Ok(BackendResponse {
                    status,
                    headers: map,
                    body: ProxyBody::from_bytes(body),
                    cancel,
                })
            }
            Some(Reply::Fail) => Err(ProxyError::Backend("connection refused".to_owned())),
            None => Err(ProxyError::Backend("script exhausted".to_owned())),
        }
    }
}
