//! # mcpforge
//!
//! A Model Context Protocol server runtime: a capability registry, a
//! JSON-RPC engine that understands the MCP method surface, and three
//! interchangeable transports (standard streams, HTTP+SSE, raw TCP) that
//! all feed the same engine.
//!
//! ```no_run
//! use mcpforge::prelude::*;
//!
//! # async fn build() -> Result<(), Box<dyn std::error::Error>> {
//! let server = ServerBuilder::new()
//!     .name("calculator")
//!     .tool(ToolDescriptor {
//!         name: "add".into(),
//!         description: Some("Add two numbers".into()),
//!         parameters: vec![],
//!         output_schema: None,
//!         is_consequential: false,
//!         invoke: std::sync::Arc::new(|_args| {
//!             Box::pin(async { Ok(CallToolResult::success(vec![Content::text("0")])) })
//!         }),
//!     })
//!     .build()?;
//!
//! server.run_stdio().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Grounded on the teacher's facade crate (`turbomcp`): a thin crate that
//! re-exports its protocol/server/transport crates behind one `prelude`
//! and adds ergonomic `run_*` entry points, gated by transport feature
//! flags.

pub use mcpforge_registry::{
    enrich, CapabilityRegistry, ParameterDescriptor, PromptDescriptor, PromptThunk, RawArguments,
    RegistryError, ResourceDescriptor, ResourceThunk, ToolDescriptor, ToolThunk,
};
pub use mcpforge_schema::{JsonSchema, SchemaMeta, TypeHandle};
pub use mcpforge_server::{
    try_current_session, with_current_session, CompletionOverride, ConnectionLimits, Engine,
    LogLevel, LoggingConfig, LoggingGuard, LogOutput, LogRotation, McpServer, ProtocolConfig,
    PushEvent, RequiredCapabilities, ResourceFallback, ServerBuilder, ServerConfig, Session,
    SessionState,
};
pub use mcpforge_types::{
    CallToolResult, Content, GetPromptResult, Implementation, McpError, McpResult, PromptMessage,
    ResourceContents, Role,
};
pub use mcpforge_uri::{self as uri};

pub use tokio;
pub use tracing;

pub use mcpforge_transport_tcp::TcpOptions;

use std::net::SocketAddr;
use std::sync::Arc;

/// Runs `server` against stdin/stdout until EOF closes the session.
pub async fn run_stdio(server: &McpServer) -> McpResult<()> {
    mcpforge_transport_stdio::run_stdio(server).await
}

/// Binds `addr` and serves the line-delimited TCP transport (spec §4.K).
pub async fn run_tcp(
    server: Arc<McpServer>,
    addr: SocketAddr,
    options: mcpforge_transport_tcp::TcpOptions,
) -> McpResult<()> {
    mcpforge_transport_tcp::run_tcp(server, addr, options).await
}

#[cfg(feature = "http")]
pub use mcpforge_transport_http::{AuthOutcome, AuthPredicate, HttpOptions};

/// Binds `addr` and serves the HTTP+SSE transport (spec §4.J).
#[cfg(feature = "http")]
pub async fn run_http(
    server: Arc<McpServer>,
    addr: SocketAddr,
    options: mcpforge_transport_http::HttpOptions,
) -> McpResult<()> {
    mcpforge_transport_http::run_http(server, addr, options).await
}

/// Everything most integrations need, in one `use mcpforge::prelude::*;`.
pub mod prelude {
    pub use crate::{
        run_stdio, run_tcp, CallToolResult, CapabilityRegistry, Content, Engine, GetPromptResult,
        Implementation, JsonSchema, McpError, McpResult, McpServer, ParameterDescriptor,
        PromptDescriptor, PromptMessage, ProtocolConfig, RawArguments, RegistryError,
        ResourceContents, ResourceDescriptor, Role, ServerBuilder, ServerConfig, Session,
        SessionState, ToolDescriptor,
    };

    #[cfg(feature = "http")]
    pub use crate::{run_http, AuthOutcome, AuthPredicate, HttpOptions};

    pub use crate::TcpOptions;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_exposes_builder_and_descriptor_types() {
        let _builder: ServerBuilder = ServerBuilder::new();
        let _ = std::marker::PhantomData::<ToolDescriptor>;
    }

    #[tokio::test]
    async fn build_then_stdio_runner_compiles_against_the_facade() {
        let server = ServerBuilder::new().name("facade-smoke-test").build().unwrap();
        assert_eq!(server.config.name, "facade-smoke-test");
    }
}
