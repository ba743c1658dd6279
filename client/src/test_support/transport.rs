//! API transport doubles.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::domain::ports::{ApiError, ApiRequest, ApiTransport};

/// Transport that answers from a script, in order.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, ApiError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    /// Answer successive requests with `script`. Requests past the end fail
    /// with a transport error.
    pub fn new(script: impl IntoIterator<Item = Result<Value, ApiError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<ApiRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(_) => panic!("requests mutex"),
        }
    }

    /// Number of requests received.
    pub fn calls(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request),
            Err(_) => panic!("requests mutex"),
        }
        let next = match self.script.lock() {
            Ok(mut script) => script.pop_front(),
            Err(_) => panic!("script mutex"),
        };
        next.unwrap_or_else(|| Err(ApiError::transport("no scripted response left")))
    }
}

/// A request held by [`GatedTransport`] until the test answers it.
#[derive(Debug)]
pub struct PendingCall {
    /// Request as received.
    pub request: ApiRequest,
    reply: oneshot::Sender<Result<Value, ApiError>>,
}

impl PendingCall {
    /// Release the request with `result`.
    pub fn respond(self, result: Result<Value, ApiError>) {
        if self.reply.send(result).is_err() {
            panic!("caller stopped waiting for {}", self.request.path);
        }
    }
}

/// Transport that parks every request until the test responds, so tests can
/// choose the order in which concurrent requests resolve.
#[derive(Debug)]
pub struct GatedTransport {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl GatedTransport {
    /// Create the transport and the receiver of its parked calls.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
        let (calls, receiver) = mpsc::unbounded_channel();
        (Self { calls }, receiver)
    }
}

#[async_trait]
impl ApiTransport for GatedTransport {
    async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let (reply, answer) = oneshot::channel();
        if self.calls.send(PendingCall { request, reply }).is_err() {
            return Err(ApiError::transport("gate closed"));
        }
        answer
            .await
            .unwrap_or_else(|_| Err(ApiError::transport("gate dropped the call")))
    }
}
