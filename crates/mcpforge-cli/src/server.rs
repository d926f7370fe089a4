//! The server this binary launches: a minimal reference implementation
//! (one tool, one resource) wired up the way a real integration would
//! register its own capabilities through `ServerBuilder`.

use mcpforge::{
    CallToolResult, Content, JsonSchema, McpError, ParameterDescriptor, ResourceContents,
    ResourceDescriptor, ResourceThunk, ServerBuilder, ToolDescriptor, ToolThunk,
};
use std::sync::Arc;

pub fn build_server(openapi_hint: bool) -> Result<mcpforge::McpServer, mcpforge::RegistryError> {
    let echo_tool = ToolDescriptor {
        name: "echo".to_string(),
        description: Some("Echoes the supplied message back as text content".to_string()),
        parameters: vec![ParameterDescriptor {
            name: "message".to_string(),
            label: "message".to_string(),
            description: Some("Text to echo back".to_string()),
            default_value: None,
            schema: JsonSchema::string(),
        }],
        output_schema: None,
        is_consequential: false,
        invoke: echo_thunk(),
    };

    let clock_resource = ResourceDescriptor {
        name: "server-time".to_string(),
        uri_templates: vec!["time://now".to_string()],
        description: Some("The server's current time, RFC 3339".to_string()),
        parameters: vec![],
        mime_type: Some("text/plain".to_string()),
        invoke: clock_thunk(),
    };

    ServerBuilder::new()
        .name("mcpforge-reference-server")
        .description(if openapi_hint {
            "mcpforge reference server (OpenAPI projection enabled)"
        } else {
            "mcpforge reference server"
        })
        .tool(echo_tool)
        .resource(clock_resource)
        .build()
}

fn echo_thunk() -> ToolThunk {
    Arc::new(|args| {
        Box::pin(async move {
            let message = args
                .get("message")
                .and_then(|v| v.as_str())
                .ok_or_else(|| McpError::missing_required_parameter("message"))?;
            Ok(CallToolResult::success(vec![Content::text(message)]))
        })
    })
}

fn clock_thunk() -> ResourceThunk {
    Arc::new(|_args| {
        Box::pin(async move {
            let now = chrono::Utc::now().to_rfc3339();
            Ok(vec![ResourceContents::text("time://now", Some("text/plain".to_string()), now)])
        })
    })
}
