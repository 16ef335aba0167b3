//! JSON-RPC types
//!
//! Request and response envelopes for the JSON-RPC 1.0 dialect spoken by the
//! upstream full node.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RpcError;

/// JSON-RPC version sent with every upstream request
pub const JSONRPC_VERSION: &str = "1.0";

/// Request id identifying this backend to the node
pub const CLIENT_ID: &str = "hylium-web";

/// JSON-RPC 1.0 request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version, always "1.0"
    pub jsonrpc: String,
    /// Request ID
    pub id: String,
    /// Method name
    pub method: String,
    /// Positional parameters
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: &str, params: &[Value]) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: CLIENT_ID.to_string(),
            method: method.to_string(),
            params: params.to_vec(),
        }
    }
}

/// Upstream response envelope.
///
/// Only the members this backend interprets are modelled; the gateway relays
/// the raw JSON body instead of this struct.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RpcEnvelope {
    /// Call result, `None` when absent or `null`
    #[serde(default)]
    pub result: Option<Value>,
    /// Error object, `None` when absent or `null`
    #[serde(default)]
    pub error: Option<Value>,
}

impl RpcEnvelope {
    /// Parse a response body into an envelope.
    pub fn from_value(body: Value) -> Result<Self, RpcError> {
        serde_json::from_value(body)
            .map_err(|e| RpcError::Transport(format!("malformed JSON-RPC envelope: {}", e)))
    }

    /// Extract the call result. A present error wins over any result.
    pub fn into_result(self) -> Result<Value, RpcError> {
        if let Some(error) = self.error {
            return Err(RpcError::from_error_object(&error));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}
