//! API error types and error handling

use actix_web::error::JsonPayloadError;
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;
use crate::stats::StatsError;

/// API Result type alias
pub type Result<T> = std::result::Result<T, ApiError>;

/// One failed check on a request body
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Dotted path of the offending field, empty for the body itself
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body failed validation
    #[error("Validation failed")]
    ValidationFailed(Vec<FieldError>),

    /// RPC method is not on the gateway whitelist
    #[error("Method not allowed")]
    MethodNotAllowed { allowed: Vec<String> },

    /// Upstream node could not be reached
    #[error("RPC call failed")]
    RpcCallFailed,

    /// No stats cached and the node is unreachable
    #[error("Unable to fetch network stats")]
    StatsUnavailable,

    #[error("Not found")]
    NotFound,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Too many requests, please try again later")]
    RateLimitExceeded { retry_after: u64 },

    /// Unexpected failure, details are logged and not returned
    #[error("Internal server error")]
    InternalError(String),
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());

        let body = match self {
            ApiError::ValidationFailed(details) => json!({
                "error": self.to_string(),
                "details": details,
            }),
            ApiError::MethodNotAllowed { allowed } => json!({
                "error": self.to_string(),
                "allowedMethods": allowed,
            }),
            ApiError::RateLimitExceeded { retry_after } => {
                response.insert_header(("Retry-After", retry_after.to_string()));
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        response.json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed { .. } => StatusCode::FORBIDDEN,
            ApiError::RpcCallFailed => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::StatsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::MethodNotAllowed { allowed, .. } => ApiError::MethodNotAllowed { allowed },
            GatewayError::Upstream(e) => {
                error!("RPC error: {}", e);
                ApiError::RpcCallFailed
            }
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        error!("{}", err);
        ApiError::StatsUnavailable
    }
}

/// Error handler for the JSON body extractor
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let api_error = match err {
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            ApiError::PayloadTooLarge
        }
        JsonPayloadError::ContentType => ApiError::ValidationFailed(vec![FieldError::new(
            "",
            "Content-Type must be application/json",
        )]),
        JsonPayloadError::Deserialize(e) => {
            ApiError::ValidationFailed(vec![FieldError::new("", format!("Invalid JSON: {}", e))])
        }
        other => ApiError::InternalError(other.to_string()),
    };
    api_error.into()
}
