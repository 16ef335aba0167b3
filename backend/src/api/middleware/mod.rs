//! API middleware components
//!
//! Request logging and per-client rate limiting.

pub mod logging;
pub mod rate_limiting;

// Re-export middleware components
pub use logging::ApiLogger;
pub use rate_limiting::RateLimiter;
