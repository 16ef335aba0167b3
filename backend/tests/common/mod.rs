#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    App,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use backend::api::middleware::RateLimiter;
use backend::api::server::app;
use backend::config::ServerConfig;
use backend::gateway::RpcGateway;
use backend::rpc::{RpcError, RpcTransport, CLIENT_ID};
use backend::stats::StatsAggregator;

/// In-memory stand-in for the upstream node. Methods without a scripted
/// reply fail as if the node refused the connection.
#[derive(Default)]
pub struct ScriptedNode {
    replies: Mutex<HashMap<String, Result<Value, RpcError>>>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` with `result` in a successful envelope
    pub fn result(self, method: &str, result: Value) -> Self {
        self.envelope(method, json!({"result": result, "error": null, "id": CLIENT_ID}))
    }

    /// Answer `method` with an RPC error envelope
    pub fn rpc_error(self, method: &str, code: i64, message: &str) -> Self {
        self.envelope(
            method,
            json!({"result": null, "error": {"code": code, "message": message}, "id": CLIENT_ID}),
        )
    }

    pub fn envelope(self, method: &str, body: Value) -> Self {
        self.replies.lock().insert(method.to_string(), Ok(body));
        self
    }

    /// Drop every scripted reply, so all calls fail to connect from now on
    pub fn disconnect(&self) {
        self.replies.lock().clear();
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// A node answering the three stats calls
    pub fn healthy() -> Self {
        Self::new()
            .result(
                "getblockchaininfo",
                json!({"chain": "main", "blocks": 123456, "difficulty": 1.5}),
            )
            .result("getmininginfo", json!({"networkhashps": 2.5e12}))
            .result("getconnectioncount", json!(8))
    }
}

#[async_trait]
impl RpcTransport for ScriptedNode {
    async fn request(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        self.calls.lock().push((method.to_string(), params.to_vec()));
        self.replies
            .lock()
            .get(method)
            .cloned()
            .unwrap_or_else(|| Err(RpcError::Transport("connection refused".to_string())))
    }
}

/// A limiter loose enough to stay out of the way
pub fn relaxed_limiter() -> RateLimiter {
    RateLimiter::with_window(10_000, Duration::from_secs(900))
}

/// The production app wired to `node`
pub fn backend_app(
    node: &Arc<ScriptedNode>,
    limiter: RateLimiter,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let transport: Arc<dyn RpcTransport> = node.clone();
    app(
        &ServerConfig::default(),
        limiter,
        Arc::new(RpcGateway::new(Arc::clone(&transport))),
        Arc::new(StatsAggregator::new(transport)),
    )
}

/// Like [`backend_app`], with a custom stats cache TTL
pub fn backend_app_with_ttl(
    node: &Arc<ScriptedNode>,
    limiter: RateLimiter,
    ttl: Duration,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let transport: Arc<dyn RpcTransport> = node.clone();
    app(
        &ServerConfig::default(),
        limiter,
        Arc::new(RpcGateway::new(Arc::clone(&transport))),
        Arc::new(StatsAggregator::with_ttl(transport, ttl)),
    )
}
