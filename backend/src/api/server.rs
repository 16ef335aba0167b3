//! API server implementation
//!
//! This module builds the actix-web application (state, middleware and
//! routes) and runs it on the configured address.

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    middleware, web, App, HttpServer,
};
use std::sync::Arc;
use tracing::info;

use super::middleware::{ApiLogger, RateLimiter};
use super::{json_config, routes};
use crate::config::{RateLimitConfig, ServerConfig};
use crate::gateway::RpcGateway;
use crate::stats::StatsAggregator;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self';base-uri 'self';\
font-src 'self' https: data:;form-action 'self';frame-ancestors 'self';\
img-src 'self' data:;object-src 'none';script-src 'self';script-src-attr 'none';\
style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests";

/// API server
pub struct ApiServer {
    config: ServerConfig,
    rate_limit: RateLimitConfig,
    gateway: Arc<RpcGateway>,
    stats: Arc<StatsAggregator>,
}

impl ApiServer {
    /// Create a new API server instance
    pub fn new(
        config: ServerConfig,
        rate_limit: RateLimitConfig,
        gateway: Arc<RpcGateway>,
        stats: Arc<StatsAggregator>,
    ) -> Self {
        Self {
            config,
            rate_limit,
            gateway,
            stats,
        }
    }

    /// Bind the listener and start serving
    pub async fn start(self) -> std::io::Result<Server> {
        let address = (self.config.bind_address.clone(), self.config.port);
        let request_timeout = self.config.request_timeout;

        // one limiter for all workers
        let limiter = RateLimiter::new(&self.rate_limit);
        let config = self.config;
        let gateway = self.gateway;
        let stats = self.stats;

        info!(
            "Starting API server on {}:{} (CORS origin {})",
            address.0, address.1, config.cors_origin
        );

        let server = HttpServer::new(move || {
            app(
                &config,
                limiter.clone(),
                Arc::clone(&gateway),
                Arc::clone(&stats),
            )
        })
        .client_request_timeout(request_timeout)
        .bind(address.clone())?
        .run();

        info!("API server started on {}:{}", address.0, address.1);

        Ok(server)
    }
}

/// The full application: shared state, middleware stack and routes.
pub fn app(
    config: &ServerConfig,
    limiter: RateLimiter,
    gateway: Arc<RpcGateway>,
    stats: Arc<StatsAggregator>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(gateway))
        .app_data(web::Data::new(stats))
        .app_data(json_config(config.max_json_payload_bytes))
        .wrap(limiter)
        .wrap(security_headers())
        .wrap(cors(&config.cors_origin))
        .wrap(middleware::NormalizePath::trim())
        .wrap(ApiLogger::new())
        .configure(routes::configure)
        .default_service(web::to(routes::not_found))
}

fn security_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("Content-Security-Policy", CONTENT_SECURITY_POLICY))
        .add(("Cross-Origin-Opener-Policy", "same-origin"))
        .add(("Cross-Origin-Resource-Policy", "same-origin"))
        .add(("Origin-Agent-Cluster", "?1"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Strict-Transport-Security", "max-age=15552000; includeSubDomains"))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-DNS-Prefetch-Control", "off"))
        .add(("X-Download-Options", "noopen"))
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-Permitted-Cross-Domain-Policies", "none"))
        .add(("X-XSS-Protection", "0"))
}

fn cors(origin: &str) -> Cors {
    let cors = if origin == "*" {
        Cors::default().allow_any_origin()
    } else {
        Cors::default().allowed_origin(origin).supports_credentials()
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(3600)
}
