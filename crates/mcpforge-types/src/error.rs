//! The protocol-layer error taxonomy (spec §7) and its mapping to JSON-RPC
//! and MCP application error codes.

use crate::jsonrpc::JsonRpcError;
use serde_json::Value;
use thiserror::Error;

/// Errors produced by the engine, router, or registry before a tool/resource/
/// prompt thunk is even invoked (or after it fails in a way the protocol
/// layer itself must report, as opposed to the `isError` envelope in §7).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum McpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("server not initialized")]
    NotInitialized,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("unknown prompt: {0}")]
    UnknownPrompt(String),
}

impl McpError {
    /// Standard JSON-RPC parse error.
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// MCP application error codes, spec §7.
    pub const UNAUTHORIZED: i32 = -32001;
    pub const NOT_INITIALIZED: i32 = -32002;

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn missing_required_parameter(parameter: &str) -> Self {
        Self::InvalidParams(format!("missing required parameter '{parameter}'"))
    }

    pub fn invalid_argument_type(parameter: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidParams(format!(
            "parameter '{parameter}' expected {expected}, got {actual}"
        ))
    }

    pub fn invalid_enum_value(parameter: &str, expected_labels: &[String], actual: &str) -> Self {
        Self::InvalidParams(format!(
            "parameter '{parameter}' expected one of [{}], got '{actual}'",
            expected_labels.join(", ")
        ))
    }

    /// The JSON-RPC error code for this error, per spec §7's taxonomy.
    pub const fn jsonrpc_code(&self) -> i32 {
        match self {
            Self::Parse(_) => Self::PARSE_ERROR,
            Self::InvalidRequest(_) => Self::INVALID_REQUEST,
            Self::MethodNotFound(_) => Self::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => Self::INVALID_PARAMS,
            Self::Internal(_) => Self::INTERNAL_ERROR,
            Self::NotInitialized => Self::NOT_INITIALIZED,
            Self::Unauthorized(_) => Self::UNAUTHORIZED,
            // "Application-level" per §7: resources/read's ResourceNotFound
            // and dispatch-time unknown-name errors surface as InvalidParams
            // (the request was well-formed; the named capability doesn't exist).
            Self::UnknownTool(_) | Self::UnknownPrompt(_) | Self::ResourceNotFound(_) => {
                Self::INVALID_PARAMS
            }
        }
    }

    pub fn to_jsonrpc_error(&self, data: Option<Value>) -> JsonRpcError {
        let mut err = JsonRpcError::new(self.jsonrpc_code(), self.to_string());
        if let Some(data) = data {
            err = err.with_data(data);
        }
        err
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        err.to_jsonrpc_error(None)
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_initialized_maps_to_spec_code() {
        assert_eq!(McpError::NotInitialized.jsonrpc_code(), -32002);
    }

    #[test]
    fn unauthorized_maps_to_spec_code() {
        assert_eq!(McpError::Unauthorized("no token".into()).jsonrpc_code(), -32001);
    }

    #[test]
    fn invalid_params_message_names_parameter() {
        let err = McpError::missing_required_parameter("b");
        assert!(err.to_string().contains("'b'"));
        assert_eq!(err.jsonrpc_code(), -32602);
    }
}
