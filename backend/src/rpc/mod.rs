//! Upstream node RPC
//!
//! JSON-RPC 1.0 transport to the single configured full node. The
//! [`RpcTransport`] trait is the seam the gateway and the stats aggregator
//! are built on; [`RpcClient`] is the HTTP implementation.

mod client;
mod error;
mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{RpcClient, RpcTransport};
pub use error::RpcError;
pub use types::{RpcEnvelope, RpcRequest, CLIENT_ID, JSONRPC_VERSION};
