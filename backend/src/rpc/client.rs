use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Client};
use serde_json::Value;
use tracing::debug;

use super::error::RpcError;
use super::types::{RpcEnvelope, RpcRequest};
use crate::config::RpcConfig;

/// Something that can exchange JSON-RPC messages with the upstream node.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Send one request and return the raw response body.
    ///
    /// Fails only with [`RpcError::Transport`]; an `error` inside the body is
    /// returned as part of the envelope.
    async fn request(&self, method: &str, params: &[Value]) -> Result<Value, RpcError>;

    /// Send one request and extract its `result`.
    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let body = self.request(method, params).await?;
        RpcEnvelope::from_value(body)?.into_result()
    }
}

/// HTTP JSON-RPC client for the upstream node
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    url: String,
    authorization: String,
    max_response_bytes: usize,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self, RpcError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        let credentials = STANDARD.encode(format!("{}:{}", config.user, config.pass));

        Ok(Self {
            client,
            url: config.url.clone(),
            authorization: format!("Basic {}", credentials),
            max_response_bytes: config.max_response_bytes,
        })
    }

    async fn read_body(&self, mut response: reqwest::Response) -> Result<Vec<u8>, RpcError> {
        let limit = self.max_response_bytes;
        if let Some(length) = response.content_length() {
            if length > limit as u64 {
                return Err(RpcError::Transport(format!(
                    "upstream response of {} bytes exceeds limit of {} bytes",
                    length, limit
                )));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(RpcError::Transport(format!(
                    "upstream response exceeds limit of {} bytes",
                    limit
                )));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl RpcTransport for RpcClient {
    async fn request(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let request = RpcRequest::new(method, params);

        let response = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, &self.authorization)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        // Nodes report RPC errors with a non-2xx status and a JSON envelope,
        // so only the body is interpreted.
        let status = response.status();
        let body = self.read_body(response).await?;
        debug!("{} answered {} with {} bytes", method, status, body.len());

        serde_json::from_slice(&body).map_err(|e| {
            RpcError::Transport(format!(
                "upstream returned a non-JSON body (HTTP {}): {}",
                status, e
            ))
        })
    }
}

impl fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("authorization", &"Basic [REDACTED]")
            .field("max_response_bytes", &self.max_response_bytes)
            .finish()
    }
}
