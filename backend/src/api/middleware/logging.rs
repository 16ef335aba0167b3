//! API logging middleware
//!
//! Tags every request with a request id and logs its outcome.

use actix_service::{Service, Transform};
use actix_web::{
    dev::{forward_ready, ServiceRequest, ServiceResponse},
    http::header::{self, HeaderName, HeaderValue},
    Error,
};
use futures::future::{ready, Ready};
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Response header echoing the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// API logger middleware
pub struct ApiLogger {}

impl ApiLogger {
    /// Create a new logging middleware
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for ApiLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = ApiLoggerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiLoggerMiddleware {
            service: Rc::new(service),
        }))
    }
}

/// API logger middleware service
pub struct ApiLoggerMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for ApiLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future =
        std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_owned();
        let peer_addr = req
            .connection_info()
            .peer_addr()
            .unwrap_or("unknown")
            .to_owned();
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_owned();

        let request_id = Uuid::new_v4().to_string();
        let service = self.service.clone();

        Box::pin(async move {
            debug!(
                "Request {} - {} {} - From {} - UA: {}",
                request_id, method, path, peer_addr, user_agent
            );

            let result = service.call(req).await;
            let elapsed = start_time.elapsed();

            match result {
                Ok(mut res) => {
                    info!(
                        "Response {} - {} {} - Status {} - Completed in {:?}",
                        request_id,
                        method,
                        path,
                        res.status().as_u16(),
                        elapsed
                    );
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        res.headers_mut()
                            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
                    }
                    Ok(res)
                }
                Err(e) => {
                    error!(
                        "Response {} - {} {} - Error: {} - Completed in {:?}",
                        request_id, method, path, e, elapsed
                    );
                    Err(e)
                }
            }
        })
    }
}
