use serde_json::Value;
use thiserror::Error;

/// Message used when the upstream flags an error without describing it
pub const GENERIC_RPC_ERROR: &str = "RPC error";

/// Errors raised while talking to the upstream node
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The node could not be reached or did not answer with a JSON body
    #[error("RPC transport error: {0}")]
    Transport(String),

    /// The node answered, but the envelope carries an `error`
    #[error("RPC error: {message}")]
    Protocol {
        code: Option<i64>,
        message: String,
    },
}

impl RpcError {
    /// Build a protocol error from the envelope's `error` member.
    pub(crate) fn from_error_object(error: &Value) -> Self {
        let message = match error {
            Value::String(message) if !message.is_empty() => message.clone(),
            _ => error
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_RPC_ERROR)
                .to_string(),
        };

        RpcError::Protocol {
            code: error.get("code").and_then(Value::as_i64),
            message,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Transport(err.to_string())
    }
}
