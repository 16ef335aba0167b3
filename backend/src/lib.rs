// Hylium website backend library

// Enforce panic-free code in production
#![cfg_attr(not(test), warn(clippy::unwrap_used))]
#![cfg_attr(not(test), warn(clippy::expect_used))]
#![cfg_attr(not(test), warn(clippy::panic))]
// Test-specific allows
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod api;
pub mod config;
pub mod gateway;
pub mod logging;
pub mod rpc;
pub mod stats;

pub use config::BackendConfig;
pub use gateway::{GatewayError, RpcGateway};
pub use stats::{NetworkStats, StatsAggregator};
