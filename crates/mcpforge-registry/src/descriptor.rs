//! Descriptor records the registry holds for each kind of capability, and
//! the type-erased invoke-thunk shape they carry (spec §3).

use mcpforge_schema::JsonSchema;
use mcpforge_types::{CallToolResult, GetPromptResult, McpResult, ResourceContents};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// One declared parameter of a tool, resource, or prompt.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    /// Internal binding name.
    pub name: String,
    /// External argument keyword; may differ from `name`.
    pub label: String,
    pub description: Option<String>,
    pub default_value: Option<Value>,
    pub schema: JsonSchema,
}

impl ParameterDescriptor {
    /// `is_required` ≡ (no default value) ∧ (schema is not itself an
    /// optional/nullable wrapper, which `schema_for` already unwraps — so
    /// absence of a default is the sole test at this layer).
    pub fn is_required(&self) -> bool {
        self.default_value.is_none()
    }
}

/// Loose JSON arguments as received on the wire, keyed by external label.
pub type RawArguments = HashMap<String, Value>;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A tool's invocation thunk: `(argument-map) -> async fallible result`.
pub type ToolThunk = Arc<dyn Fn(RawArguments) -> BoxFuture<'static, McpResult<CallToolResult>> + Send + Sync>;

/// A resource's invocation thunk: matched URI variables in, resource body out.
pub type ResourceThunk =
    Arc<dyn Fn(RawArguments) -> BoxFuture<'static, McpResult<Vec<ResourceContents>>> + Send + Sync>;

/// A prompt's invocation thunk: arguments in, rendered messages out.
pub type PromptThunk =
    Arc<dyn Fn(RawArguments) -> BoxFuture<'static, McpResult<GetPromptResult>> + Send + Sync>;

#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub output_schema: Option<JsonSchema>,
    pub is_consequential: bool,
    pub invoke: ToolThunk,
}

impl ToolDescriptor {
    pub fn input_schema(&self) -> JsonSchema {
        let required: Vec<String> = self
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.label.clone())
            .collect();
        let properties = self
            .parameters
            .iter()
            .map(|p| (p.label.clone(), p.schema.clone()))
            .collect();
        JsonSchema::object(properties, required)
    }
}

#[derive(Clone)]
pub struct ResourceDescriptor {
    pub name: String,
    /// A single descriptor may declare multiple URI templates that all
    /// resolve to the same handler (spec §3).
    pub uri_templates: Vec<String>,
    pub description: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub mime_type: Option<String>,
    pub invoke: ResourceThunk,
}

#[derive(Clone)]
pub struct PromptDescriptor {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub invoke: PromptThunk,
}
