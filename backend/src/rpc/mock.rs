//! In-memory transport for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::{RpcError, RpcTransport, CLIENT_ID};

/// Scripted reply for one method
#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    /// Raw envelope returned as the response body
    Envelope(Value),
    /// Transport failure
    Fail(RpcError),
    /// Panic inside the call, standing in for a programming error
    Panic,
}

impl MockReply {
    pub(crate) fn result(result: Value) -> Self {
        MockReply::Envelope(json!({"result": result, "error": null, "id": CLIENT_ID}))
    }

    pub(crate) fn rpc_error(code: i64, message: &str) -> Self {
        MockReply::Envelope(json!({
            "result": null,
            "error": {"code": code, "message": message},
            "id": CLIENT_ID
        }))
    }

    pub(crate) fn unreachable() -> Self {
        MockReply::Fail(RpcError::Transport("connection refused".to_string()))
    }
}

#[derive(Default)]
pub(crate) struct MockTransport {
    replies: Mutex<HashMap<String, MockReply>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(self, method: &str, reply: MockReply) -> Self {
        self.set(method, reply);
        self
    }

    pub(crate) fn set(&self, method: &str, reply: MockReply) {
        self.replies.lock().insert(method.to_string(), reply);
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn request(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params.to_vec()));
        let reply = self.replies.lock().get(method).cloned();

        match reply {
            Some(MockReply::Envelope(body)) => Ok(body),
            Some(MockReply::Fail(err)) => Err(err),
            Some(MockReply::Panic) => panic!("scripted panic in {}", method),
            None => Err(RpcError::Transport(format!("no reply scripted for {}", method))),
        }
    }
}
