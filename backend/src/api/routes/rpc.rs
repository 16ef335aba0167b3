//! RPC proxy route
//!
//! `POST /api/rpc` with `{"method": "...", "params": [...]}`. The body is
//! validated here; the whitelist decision belongs to the gateway.

use actix_web::{web, HttpResponse};
use serde_json::{Map, Value};

use super::GatewayData;
use crate::api::error::{ApiError, FieldError, Result};

/// Validated proxy request
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    pub method: String,
    pub params: Vec<Value>,
}

impl GatewayRequest {
    /// Validate a raw JSON body, collecting every field error.
    pub fn from_body(body: Value) -> Result<Self> {
        let map = match body {
            Value::Object(map) => map,
            other => {
                return Err(ApiError::ValidationFailed(vec![FieldError::new(
                    "",
                    format!("Expected object, received {}", type_name(&other)),
                )]))
            }
        };

        let mut errors = Vec::new();
        let method = validate_method(&map, &mut errors);
        let params = validate_params(&map, &mut errors);

        match (method, params) {
            (Some(method), Some(params)) if errors.is_empty() => Ok(Self { method, params }),
            _ => Err(ApiError::ValidationFailed(errors)),
        }
    }
}

fn validate_method(map: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<String> {
    match map.get("method") {
        Some(Value::String(method)) if !method.is_empty() => Some(method.clone()),
        Some(Value::String(_)) => {
            errors.push(FieldError::new(
                "method",
                "String must contain at least 1 character(s)",
            ));
            None
        }
        None | Some(Value::Null) => {
            errors.push(FieldError::new("method", "Required"));
            None
        }
        Some(other) => {
            errors.push(FieldError::new(
                "method",
                format!("Expected string, received {}", type_name(other)),
            ));
            None
        }
    }
}

fn validate_params(map: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<Vec<Value>> {
    match map.get("params") {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(params)) => Some(params.clone()),
        Some(other) => {
            errors.push(FieldError::new(
                "params",
                format!("Expected array, received {}", type_name(other)),
            ));
            None
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Configure RPC proxy routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/rpc", web::post().to(proxy_rpc));
}

/// Forward a whitelisted call and relay the upstream envelope as-is
pub async fn proxy_rpc(gateway: GatewayData, body: web::Json<Value>) -> Result<HttpResponse> {
    let request = GatewayRequest::from_body(body.into_inner())?;
    let envelope = gateway.proxy(&request.method, request.params).await?;
    Ok(HttpResponse::Ok().json(envelope))
}
