//! Whitelisted passthrough to the upstream node
//!
//! Untrusted callers may only reach read-only chain, block, peer and network
//! introspection methods. Everything else is refused before the node is
//! contacted, and the refusal lists the allowed methods.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::rpc::{RpcError, RpcTransport};

/// Methods the gateway forwards, in disclosure order
pub const ALLOWED_METHODS: [&str; 13] = [
    "getblockchaininfo",
    "getblockcount",
    "getdifficulty",
    "getnetworkhashps",
    "getmininginfo",
    "getpeerinfo",
    "getnettotals",
    "getconnectioncount",
    "getbestblockhash",
    "getblock",
    "getblockhash",
    "getrawtransaction",
    "decoderawtransaction",
];

/// Gateway errors
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Method is not on the whitelist
    #[error("Method not allowed: {method}")]
    MethodNotAllowed { method: String, allowed: Vec<String> },

    /// The upstream node could not be reached
    #[error(transparent)]
    Upstream(#[from] RpcError),
}

/// Fixed set of lowercase method names
#[derive(Debug, Clone)]
pub struct MethodWhitelist {
    methods: Vec<&'static str>,
}

impl MethodWhitelist {
    pub fn new() -> Self {
        Self {
            methods: ALLOWED_METHODS.to_vec(),
        }
    }

    /// Case-insensitive membership test
    pub fn contains(&self, method: &str) -> bool {
        let method = method.to_lowercase();
        self.methods.iter().any(|allowed| *allowed == method)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.to_string()).collect()
    }
}

impl Default for MethodWhitelist {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RpcGateway {
    transport: Arc<dyn RpcTransport>,
    whitelist: MethodWhitelist,
}

impl RpcGateway {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            transport,
            whitelist: MethodWhitelist::new(),
        }
    }

    /// Forward `method` and `params` unchanged and return the raw envelope.
    ///
    /// An envelope whose `error` is set is still `Ok`: a failed lookup on the
    /// node is an answer for the caller, not a gateway fault.
    pub async fn proxy(&self, method: &str, params: Vec<Value>) -> Result<Value, GatewayError> {
        if !self.whitelist.contains(method) {
            warn!("Rejected RPC method '{}'", method);
            return Err(GatewayError::MethodNotAllowed {
                method: method.to_string(),
                allowed: self.whitelist.to_vec(),
            });
        }

        debug!("Forwarding {} with {} params", method, params.len());
        let envelope = self.transport.request(method, &params).await?;
        Ok(envelope)
    }
}
