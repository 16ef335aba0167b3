//! HTTP API
//!
//! Public endpoints of the backend: the whitelisted RPC proxy, cached
//! network stats and a health check.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::ApiServer;

use actix_web::web;

/// JSON extractor settings: body size limit and JSON error bodies
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(error::json_error_handler)
}
