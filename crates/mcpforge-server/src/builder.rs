//! `ServerBuilder`: assembles a registry, configuration, and optional hooks
//! into a runnable [`McpServer`]. Grounded on the teacher's
//! `ServerConfigBuilder` (fluent setters collected into one `build()` call).

use crate::config::ServerConfig;
use crate::engine::{CompletionOverride, Engine, ResourceFallback};
use crate::logging::LoggingConfig;
use mcpforge_registry::{CapabilityRegistry, PromptDescriptor, RegistryError, ResourceDescriptor, ToolDescriptor};
use mcpforge_types::Implementation;
use std::sync::Arc;

pub struct ServerBuilder {
    config: ServerConfig,
    registry: CapabilityRegistry,
    logging: Option<LoggingConfig>,
    resource_fallback: Option<ResourceFallback>,
    completion_override: Option<CompletionOverride>,
    pending: Result<(), RegistryError>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            registry: CapabilityRegistry::new(),
            logging: None,
            resource_fallback: None,
            completion_override: None,
            pending: Ok(()),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.config.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.config.description = Some(description.into());
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Registers a tool. A registration error is latched and surfaced by
    /// `build()`, so chained calls need no intermediate `?`.
    pub fn tool(mut self, descriptor: ToolDescriptor) -> Self {
        if self.pending.is_ok() {
            self.pending = self.registry.register_tool(descriptor);
        }
        self
    }

    pub fn resource(mut self, descriptor: ResourceDescriptor) -> Self {
        if self.pending.is_ok() {
            self.pending = self.registry.register_resource(descriptor);
        }
        self
    }

    pub fn prompt(mut self, descriptor: PromptDescriptor) -> Self {
        if self.pending.is_ok() {
            self.pending = self.registry.register_prompt(descriptor);
        }
        self
    }

    pub fn resource_fallback(mut self, hook: ResourceFallback) -> Self {
        self.resource_fallback = Some(hook);
        self
    }

    pub fn completion_override(mut self, hook: CompletionOverride) -> Self {
        self.completion_override = Some(hook);
        self
    }

    pub fn build(self) -> Result<McpServer, RegistryError> {
        self.pending?;
        let server_info = Implementation::new(self.config.name.clone(), self.config.version.clone());
        let registry = Arc::new(self.registry);
        let config = Arc::new(self.config);
        let mut engine = Engine::new(registry, config.clone(), server_info);
        engine.resource_fallback = self.resource_fallback;
        engine.completion_override = self.completion_override;
        Ok(McpServer {
            engine: Arc::new(engine),
            config,
            logging: self.logging,
        })
    }
}

/// The assembled, ready-to-run server: an engine plus the configuration a
/// transport needs to honor (message size limits, shutdown deadline).
#[derive(Clone)]
pub struct McpServer {
    pub engine: Arc<Engine>,
    pub config: Arc<ServerConfig>,
    pub logging: Option<LoggingConfig>,
}

impl McpServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Initializes logging per the configured `LoggingConfig`, if any. The
    /// returned guard must be held for the process lifetime.
    pub fn init_logging(&self) -> std::io::Result<Option<crate::logging::LoggingGuard>> {
        match &self.logging {
            Some(config) => config.init(),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_types::CallToolResult;
    use mcpforge_schema::JsonSchema;

    fn noop_tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: None,
            parameters: vec![],
            output_schema: None,
            is_consequential: false,
            invoke: Arc::new(|_| Box::pin(async { Ok(CallToolResult::void()) })),
        }
    }

    #[test]
    fn duplicate_tool_registration_is_surfaced_at_build() {
        let result = ServerBuilder::new().tool(noop_tool("x")).tool(noop_tool("x")).build();
        assert!(result.is_err());
    }

    #[test]
    fn build_wires_server_name_into_engine() {
        let server = ServerBuilder::new().name("demo").version("9.9.9").build().unwrap();
        assert_eq!(server.engine.server_info.name, "demo");
    }

    #[test]
    fn first_tool_input_schema_is_object() {
        let mut tool = noop_tool("echo");
        tool.parameters.push(mcpforge_registry::ParameterDescriptor {
            name: "text".into(),
            label: "text".into(),
            description: None,
            default_value: None,
            schema: JsonSchema::string(),
        });
        let server = ServerBuilder::new().tool(tool).build().unwrap();
        assert!(server.engine.registry.tool("echo").is_some());
    }
}
