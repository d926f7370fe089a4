//! Wire types for the Model Context Protocol.
//!
//! This crate has no knowledge of transports, sessions, or dispatch — it is
//! purely the JSON-RPC envelope (`jsonrpc`), the error taxonomy (`error`),
//! and the content/result shapes that travel inside that envelope
//! (`content`).

pub mod content;
pub mod error;
pub mod jsonrpc;

pub use content::{
    AudioContent, CallToolResult, Content, EmbeddedResourceContent, GetPromptResult, Implementation,
    ImageContent, Meta, PromptMessage, ResourceContents, ResourceLinkContent, Role, TextContent,
    ToolAnnotations,
};
pub use error::{McpError, McpResult};
pub use jsonrpc::{
    IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponsePayload, JsonRpcVersion, RequestId, ResponseId, JSONRPC_VERSION,
};
