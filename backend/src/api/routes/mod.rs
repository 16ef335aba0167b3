//! API routes
//!
//! This module defines the HTTP routes of the backend.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::sync::Arc;

use super::error::ApiError;
use crate::gateway::RpcGateway;
use crate::stats::StatsAggregator;

pub mod rpc;
pub mod stats;

// Type aliases for the shared state passed to route handlers
pub type GatewayData = web::Data<Arc<RpcGateway>>;
pub type StatsData = web::Data<Arc<StatsAggregator>>;

/// Configure all API routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(stats::configure)
            .configure(rpc::configure),
    );

    cfg.route("/health", web::get().to(health_check));
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fallback for unknown routes
pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}
