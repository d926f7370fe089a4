//! Demo project showcasing `mcpforge`: a two-operation calculator tool, a
//! name-templated greeting resource, and a summary prompt, runnable over
//! any of the three transports. Grounded on the teacher's own
//! `demo/src/main.rs` (a minimal `ServerBuilder` + `run_stdio` binary) and
//! its library doc comment's "Runtime Transport Selection" pattern
//! (`TRANSPORT` env var switching between `run_stdio`/`run_tcp`/`run_http`).

use mcpforge::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let server = build_server()?;

    match std::env::var("TRANSPORT").as_deref() {
        Ok("tcp") => {
            let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "7420".to_string()).parse()?;
            let addr = format!("127.0.0.1:{port}").parse()?;
            mcpforge::run_tcp(Arc::new(server), addr, TcpOptions::default()).await?;
        }
        Ok("http") => {
            let port: u16 = std::env::var("PORT").unwrap_or_else(|_| "7421".to_string()).parse()?;
            let addr = format!("127.0.0.1:{port}").parse()?;
            mcpforge::run_http(Arc::new(server), addr, HttpOptions::default()).await?;
        }
        _ => {
            mcpforge::run_stdio(&server).await?;
        }
    }

    Ok(())
}

fn build_server() -> Result<McpServer, RegistryError> {
    ServerBuilder::new()
        .name("mcpforge-demo")
        .version("0.1.0")
        .description("Calculator tool, greeting resource, summary prompt")
        .tool(add_tool())
        .tool(multiply_tool())
        .resource(greeting_resource())
        .prompt(summarize_prompt())
        .build()
}

fn number_param(label: &str, description: &str) -> ParameterDescriptor {
    ParameterDescriptor {
        name: label.to_string(),
        label: label.to_string(),
        description: Some(description.to_string()),
        default_value: None,
        schema: JsonSchema::number(),
    }
}

fn add_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "add".to_string(),
        description: Some("Adds two numbers".to_string()),
        parameters: vec![number_param("a", "first addend"), number_param("b", "second addend")],
        output_schema: None,
        is_consequential: false,
        invoke: Arc::new(|args| {
            Box::pin(async move {
                let a = args.get("a").and_then(|v| v.as_f64()).ok_or_else(|| McpError::missing_required_parameter("a"))?;
                let b = args.get("b").and_then(|v| v.as_f64()).ok_or_else(|| McpError::missing_required_parameter("b"))?;
                Ok(CallToolResult::success(vec![Content::text((a + b).to_string())]))
            })
        }),
    }
}

fn multiply_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "multiply".to_string(),
        description: Some("Multiplies two numbers".to_string()),
        parameters: vec![number_param("a", "first factor"), number_param("b", "second factor")],
        output_schema: None,
        is_consequential: false,
        invoke: Arc::new(|args| {
            Box::pin(async move {
                let a = args.get("a").and_then(|v| v.as_f64()).ok_or_else(|| McpError::missing_required_parameter("a"))?;
                let b = args.get("b").and_then(|v| v.as_f64()).ok_or_else(|| McpError::missing_required_parameter("b"))?;
                Ok(CallToolResult::success(vec![Content::text((a * b).to_string())]))
            })
        }),
    }
}

fn greeting_resource() -> ResourceDescriptor {
    ResourceDescriptor {
        name: "greeting".to_string(),
        uri_templates: vec!["greeting://{name}".to_string()],
        description: Some("A friendly greeting for the named person".to_string()),
        parameters: vec![],
        mime_type: Some("text/plain".to_string()),
        invoke: Arc::new(|args| {
            Box::pin(async move {
                let name = args.get("name").and_then(|v| v.as_str()).unwrap_or("there");
                let uri = format!("greeting://{name}");
                Ok(vec![ResourceContents::text(uri, Some("text/plain".to_string()), format!("Hello, {name}!"))])
            })
        }),
    }
}

fn summarize_prompt() -> PromptDescriptor {
    PromptDescriptor {
        name: "summarize".to_string(),
        description: Some("Asks the model to summarize the given text in one sentence".to_string()),
        parameters: vec![ParameterDescriptor {
            name: "text".to_string(),
            label: "text".to_string(),
            description: Some("The text to summarize".to_string()),
            default_value: None,
            schema: JsonSchema::string(),
        }],
        invoke: Arc::new(|args| {
            Box::pin(async move {
                let text = args.get("text").and_then(|v| v.as_str()).ok_or_else(|| McpError::missing_required_parameter("text"))?;
                Ok(GetPromptResult {
                    description: Some("Summarization request".to_string()),
                    messages: vec![PromptMessage {
                        role: Role::User,
                        content: Content::text(format!("Summarize this in one sentence:\n\n{text}")),
                    }],
                })
            })
        }),
    }
}
