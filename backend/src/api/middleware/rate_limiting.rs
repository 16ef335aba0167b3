//! API rate limiting middleware
//!
//! Fixed window per client address. The window opens on a client's first
//! request and every worker shares the same counters.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::Method,
    Error,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::api::error::ApiError;
use crate::config::RateLimitConfig;

/// Entry in the rate limiter store
struct RateLimitEntry {
    /// Start of the client's current window
    first_request: Instant,
    /// Requests counted in the current window
    count: u32,
}

/// Per-client entries plus the time expired ones were last dropped
struct ClientTable {
    entries: HashMap<String, RateLimitEntry>,
    last_sweep: Instant,
}

/// Rate limiter state shared between workers
struct RateLimiterState {
    clients: Mutex<ClientTable>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiterState {
    /// Count one request from `client`, or return the seconds it must wait.
    fn check(&self, client: &str, now: Instant) -> Result<(), u64> {
        let mut clients = self.clients.lock();
        let window = self.window;

        // at most one full scan per window
        if now.duration_since(clients.last_sweep) >= window {
            clients
                .entries
                .retain(|_, entry| now.duration_since(entry.first_request) < window);
            clients.last_sweep = now;
        }

        let entry = clients
            .entries
            .entry(client.to_string())
            .or_insert_with(|| RateLimitEntry {
                first_request: now,
                count: 0,
            });

        if now.duration_since(entry.first_request) >= window {
            entry.first_request = now;
            entry.count = 0;
        }

        if entry.count >= self.max_requests {
            let remaining = window.saturating_sub(now.duration_since(entry.first_request));
            return Err(retry_after_secs(remaining));
        }

        entry.count += 1;
        Ok(())
    }
}

fn retry_after_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

/// Rate limiting middleware
///
/// Clones share their counters, so build one limiter outside the
/// `HttpServer` factory and clone it into each app.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_window(config.max_requests, config.window)
    }

    pub fn with_window(max_requests: u32, window: Duration) -> Self {
        Self {
            state: Arc::new(RateLimiterState {
                clients: Mutex::new(ClientTable {
                    entries: HashMap::new(),
                    last_sweep: Instant::now(),
                }),
                max_requests,
                window,
            }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            state: self.state.clone(),
        }))
    }
}

/// Rate limiting middleware service
pub struct RateLimiterMiddleware<S> {
    service: S,
    state: Arc<RateLimiterState>,
}

impl<S, B> Service<ServiceRequest> for RateLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Pre-flight CORS requests are not counted
        if req.method() != Method::OPTIONS {
            let client = req
                .connection_info()
                .peer_addr()
                .unwrap_or("unknown")
                .to_string();

            if let Err(retry_after) = self.state.check(&client, Instant::now()) {
                warn!("Rate limit exceeded for client {}", client);
                let res = req.error_response(ApiError::RateLimitExceeded { retry_after });
                return Box::pin(ready(Ok(res.map_into_right_body())));
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}
