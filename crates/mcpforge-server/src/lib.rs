//! Session lifecycle, method routing, and the engine that implements the
//! MCP method surface on top of `mcpforge-registry`.

pub mod builder;
pub mod codec;
pub mod config;
pub mod engine;
pub mod logging;
pub mod session;

pub use builder::{McpServer, ServerBuilder};
pub use codec::{parse_incoming, render_batch, Batch};
pub use config::{ConnectionLimits, ProtocolConfig, RequiredCapabilities, ServerConfig};
pub use engine::{CompletionOverride, Engine, ResourceFallback};
pub use logging::{LogOutput, LogRotation, LoggingConfig, LoggingGuard};
pub use session::{with_current_session, try_current_session, LogLevel, PushEvent, Session, SessionState};
