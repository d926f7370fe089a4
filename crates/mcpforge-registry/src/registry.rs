//! The capability registry (spec §4.C): thread-safe, lock-free-after-construction
//! maps from external name to descriptor, for each of the three capability kinds.

use crate::descriptor::{PromptDescriptor, ResourceDescriptor, ToolDescriptor};
use dashmap::DashMap;
use mcpforge_uri::{parse_template, Template};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("a {kind} named '{name}' is already registered")]
    AlreadyExists { kind: &'static str, name: String },
    #[error("invalid URI template '{template}': {source}")]
    InvalidTemplate {
        template: String,
        source: mcpforge_uri::UriTemplateError,
    },
}

/// A resource descriptor paired with one of its parsed URI templates, kept
/// in registration order so that `resources/read`'s longest-match tie-break
/// ("ties broken by declaration order", spec §4.H) is well defined.
#[derive(Clone)]
struct TemplateEntry {
    template: Template,
    descriptor: Arc<ResourceDescriptor>,
}

/// Holds `tools`, `resources`, `prompts` maps plus the ordered list of
/// parsed resource templates used for matching.
pub struct CapabilityRegistry {
    tools: DashMap<String, Arc<ToolDescriptor>>,
    resources: DashMap<String, Arc<ResourceDescriptor>>,
    prompts: DashMap<String, Arc<PromptDescriptor>>,
    template_entries: parking_lot::RwLock<Vec<TemplateEntry>>,
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            resources: DashMap::new(),
            prompts: DashMap::new(),
            template_entries: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Registers a tool. Duplicate registration is a programmer error: it
    /// fails fast rather than silently overwriting.
    pub fn register_tool(&self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::AlreadyExists {
                kind: "tool",
                name: descriptor.name,
            });
        }
        self.tools.insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn register_resource(&self, descriptor: ResourceDescriptor) -> Result<(), RegistryError> {
        if self.resources.contains_key(&descriptor.name) {
            return Err(RegistryError::AlreadyExists {
                kind: "resource",
                name: descriptor.name,
            });
        }
        let mut parsed_templates = Vec::with_capacity(descriptor.uri_templates.len());
        for raw in &descriptor.uri_templates {
            let template = parse_template(raw).map_err(|source| RegistryError::InvalidTemplate {
                template: raw.clone(),
                source,
            })?;
            parsed_templates.push(template);
        }

        let descriptor = Arc::new(descriptor);
        self.resources.insert(descriptor.name.clone(), descriptor.clone());

        let mut entries = self.template_entries.write();
        for template in parsed_templates {
            entries.push(TemplateEntry {
                template,
                descriptor: descriptor.clone(),
            });
        }
        Ok(())
    }

    pub fn register_prompt(&self, descriptor: PromptDescriptor) -> Result<(), RegistryError> {
        if self.prompts.contains_key(&descriptor.name) {
            return Err(RegistryError::AlreadyExists {
                kind: "prompt",
                name: descriptor.name,
            });
        }
        self.prompts.insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<Arc<ToolDescriptor>> {
        self.tools.get(name).map(|e| e.clone())
    }

    pub fn resource(&self, name: &str) -> Option<Arc<ResourceDescriptor>> {
        self.resources.get(name).map(|e| e.clone())
    }

    pub fn prompt(&self, name: &str) -> Option<Arc<PromptDescriptor>> {
        self.prompts.get(name).map(|e| e.clone())
    }

    pub fn list_tools(&self) -> Vec<Arc<ToolDescriptor>> {
        self.tools.iter().map(|e| e.value().clone()).collect()
    }

    pub fn list_resources(&self) -> Vec<Arc<ResourceDescriptor>> {
        self.resources.iter().map(|e| e.value().clone()).collect()
    }

    pub fn list_prompts(&self) -> Vec<Arc<PromptDescriptor>> {
        self.prompts.iter().map(|e| e.value().clone()).collect()
    }

    /// §4.H `resources/read` step 1: across all resource descriptors,
    /// collect `(descriptor, template)` pairs whose template matches `uri`,
    /// select the one with the largest extracted variable set, ties broken
    /// by declaration order (first registered wins, since we scan in
    /// registration order and only replace the best match on a strict `>`).
    pub fn match_resource_template(
        &self,
        uri: &str,
    ) -> Result<Option<(Arc<ResourceDescriptor>, std::collections::HashMap<String, String>)>, mcpforge_uri::UriTemplateError>
    {
        let entries = self.template_entries.read();
        let mut best: Option<(usize, Arc<ResourceDescriptor>, std::collections::HashMap<String, String>)> = None;

        for entry in entries.iter() {
            if let Some(bindings) = mcpforge_uri::r#match(uri, &entry.template.raw)? {
                let count = bindings.len();
                let replace = match &best {
                    Some((best_count, _, _)) => count > *best_count,
                    None => true,
                };
                if replace {
                    best = Some((count, entry.descriptor.clone(), bindings));
                }
            }
        }

        Ok(best.map(|(_, descriptor, bindings)| (descriptor, bindings)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ParameterDescriptor;
    use mcpforge_schema::JsonSchema;
    use mcpforge_types::{CallToolResult, Content};
    use std::sync::Arc as StdArc;

    fn dummy_tool(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: None,
            parameters: vec![],
            output_schema: None,
            is_consequential: false,
            invoke: StdArc::new(|_args| Box::pin(async { Ok(CallToolResult::success(vec![Content::text("ok")], None)) })),
        }
    }

    #[test]
    fn duplicate_tool_registration_fails_fast() {
        let registry = CapabilityRegistry::new();
        registry.register_tool(dummy_tool("add")).unwrap();
        let err = registry.register_tool(dummy_tool("add")).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists { kind: "tool", .. }));
    }

    #[test]
    fn tool_input_schema_lists_only_required_params() {
        let descriptor = ToolDescriptor {
            name: "add".into(),
            description: None,
            parameters: vec![
                ParameterDescriptor {
                    name: "a".into(),
                    label: "a".into(),
                    description: None,
                    default_value: None,
                    schema: JsonSchema::number(),
                },
                ParameterDescriptor {
                    name: "b".into(),
                    label: "b".into(),
                    description: None,
                    default_value: Some(serde_json::json!(0)),
                    schema: JsonSchema::number(),
                },
            ],
            output_schema: None,
            is_consequential: false,
            invoke: StdArc::new(|_| Box::pin(async { Ok(CallToolResult::void()) })),
        };
        match descriptor.input_schema() {
            JsonSchema::Object { required, .. } => assert_eq!(required, vec!["a".to_string()]),
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn longest_match_wins_over_fewer_variables() {
        let registry = CapabilityRegistry::new();
        registry
            .register_resource(ResourceDescriptor {
                name: "users".into(),
                uri_templates: vec!["users://{user_id}".into()],
                description: None,
                parameters: vec![],
                mime_type: None,
                invoke: StdArc::new(|_| Box::pin(async { Ok(vec![]) })),
            })
            .unwrap();
        registry
            .register_resource(ResourceDescriptor {
                name: "user_posts".into(),
                uri_templates: vec!["users://{user_id}/posts/{post_id}".into()],
                description: None,
                parameters: vec![],
                mime_type: None,
                invoke: StdArc::new(|_| Box::pin(async { Ok(vec![]) })),
            })
            .unwrap();

        let (descriptor, bindings) = registry
            .match_resource_template("users://42/posts/7")
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.name, "user_posts");
        assert_eq!(bindings.get("post_id"), Some(&"7".to_string()));
    }
}
