//! The MCP engine (spec §4.F, §4.H): state-gated method routing plus the
//! business logic behind each method in the MCP namespace.

use crate::session::{with_current_session, LogLevel, PushEvent, Session, SessionState};
use crate::ServerConfig;
use mcpforge_registry::{coercion, enrich, CapabilityRegistry, RawArguments};
use mcpforge_types::{
    CallToolResult, Content, GetPromptResult, Implementation, IncomingMessage,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpError, McpResult, ResponseId,
};
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Invoked when no registered URI template matches a `resources/read` URI.
/// Returning an empty vec is treated as `ResourceNotFound` (spec §4.H).
pub type ResourceFallback = Arc<dyn Fn(String) -> BoxFuture<'static, McpResult<Vec<mcpforge_types::ResourceContents>>> + Send + Sync>;

/// Overrides `completion/complete` for a specific parameter name.
pub type CompletionOverride = Arc<dyn Fn(&str, &str) -> Option<Vec<String>> + Send + Sync>;

/// Methods reachable before `initialize` completes (spec §4.F).
fn allowed_before_initialize(method: &str) -> bool {
    method == "initialize" || method == "ping" || method.starts_with("notifications/")
}

pub struct Engine {
    pub registry: Arc<CapabilityRegistry>,
    pub config: Arc<ServerConfig>,
    pub server_info: Implementation,
    pub resource_fallback: Option<ResourceFallback>,
    pub completion_override: Option<CompletionOverride>,
}

impl Engine {
    pub fn new(registry: Arc<CapabilityRegistry>, config: Arc<ServerConfig>, server_info: Implementation) -> Self {
        Self {
            registry,
            config,
            server_info,
            resource_fallback: None,
            completion_override: None,
        }
    }

    /// Dispatches one incoming message. Returns `None` for notifications and
    /// for requests discarded in `Closed` state.
    pub async fn dispatch(&self, session: &Arc<Session>, incoming: IncomingMessage) -> Option<JsonRpcResponse> {
        if session.state() == SessionState::Closed {
            return None;
        }

        let method = incoming.method().to_string();

        if session.state() == SessionState::Uninitialized && !allowed_before_initialize(&method) {
            return match &incoming {
                IncomingMessage::Request(r) => Some(JsonRpcResponse::error(
                    ResponseId::from_request(r.id.clone()),
                    McpError::NotInitialized.to_jsonrpc_error(None),
                )),
                IncomingMessage::Notification(_) => None,
            };
        }

        match incoming {
            IncomingMessage::Request(request) => Some(self.handle_request(session, request).await),
            IncomingMessage::Notification(notification) => {
                self.handle_notification(session, notification).await;
                None
            }
        }
    }

    /// Dispatches a whole parsed frame (single message or batch) and renders
    /// the result, or `None` if nothing should be written back (a lone
    /// notification, or a batch made entirely of notifications).
    pub async fn dispatch_frame(&self, session: &Arc<Session>, batch: crate::codec::Batch) -> Option<Value> {
        match batch {
            crate::codec::Batch::Single(message) => {
                let response = self.dispatch(session, message).await?;
                Some(serde_json::to_value(response).expect("JsonRpcResponse always serializes"))
            }
            crate::codec::Batch::Many(messages) => {
                let mut responses = Vec::with_capacity(messages.len());
                for message in messages {
                    if let Some(response) = self.dispatch(session, message).await {
                        responses.push(response);
                    }
                }
                crate::codec::render_batch(responses)
            }
        }
    }

    async fn handle_request(&self, session: &Arc<Session>, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = ResponseId::from_request(request.id.clone());
        let params = request.params.unwrap_or(Value::Null);

        let result = with_current_session(session.clone(), self.route(session, &request.method, params)).await;

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(id, err.to_jsonrpc_error(None)),
        }
    }

    async fn handle_notification(&self, session: &Arc<Session>, notification: JsonRpcNotification) {
        if notification.method == "notifications/initialized" {
            return;
        }
        let params = notification.params.unwrap_or(Value::Null);
        let _ = with_current_session(session.clone(), self.route(session, &notification.method, params)).await;
    }

    async fn route(&self, session: &Arc<Session>, method: &str, params: Value) -> McpResult<Value> {
        match method {
            "initialize" => self.do_initialize(session, params),
            "tools/list" => Ok(self.do_tools_list()),
            "tools/call" => self.do_tools_call(params).await,
            "resources/list" => Ok(self.do_resources_list()),
            "resources/templates/list" => Ok(self.do_resources_templates_list()),
            "resources/read" => self.do_resources_read(params).await,
            "prompts/list" => Ok(self.do_prompts_list()),
            "prompts/get" => self.do_prompts_get(params).await,
            "completion/complete" => Ok(self.do_completion(params)),
            "logging/setLevel" => self.do_set_level(session, params),
            "ping" => Ok(json!({})),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn do_initialize(&self, session: &Arc<Session>, params: Value) -> McpResult<Value> {
        // spec §9: `initialize` may be issued exactly once; a second attempt
        // is `InvalidRequest`, not silently accepted.
        if !session.begin_initialize() {
            return Err(McpError::InvalidRequest("server already initialized".to_string()));
        }

        let client_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("missing 'protocolVersion'"))?;

        let client_info_value = params
            .get("clientInfo")
            .ok_or_else(|| McpError::invalid_params("missing 'clientInfo'"))?;
        let client_name = client_info_value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("clientInfo.name is required"))?;
        let client_version_str = client_info_value
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("clientInfo.version is required"))?;

        let negotiated_version = self.config.protocol.negotiate(client_version);

        let mut kinds = std::collections::HashSet::new();
        let mut capabilities = serde_json::Map::new();
        if !self.registry.list_tools().is_empty() {
            kinds.insert("tools".to_string());
            capabilities.insert("tools".to_string(), json!({ "listChanged": true }));
        }
        if !self.registry.list_resources().is_empty() {
            kinds.insert("resources".to_string());
            capabilities.insert("resources".to_string(), json!({ "listChanged": true }));
        }
        if !self.registry.list_prompts().is_empty() {
            kinds.insert("prompts".to_string());
            capabilities.insert("prompts".to_string(), json!({ "listChanged": true }));
        }
        capabilities.insert("completion".to_string(), json!({}));
        capabilities.insert("logging".to_string(), json!({}));

        session.complete_initialize(
            negotiated_version.clone(),
            Implementation::new(client_name, client_version_str),
            kinds,
        );

        Ok(json!({
            "protocolVersion": negotiated_version,
            "capabilities": Value::Object(capabilities),
            "serverInfo": { "name": self.server_info.name, "version": self.server_info.version },
        }))
    }

    fn do_tools_list(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .list_tools()
            .into_iter()
            .map(|t| {
                let mut entry = json!({
                    "name": t.name,
                    "inputSchema": t.input_schema(),
                });
                if let Some(description) = &t.description {
                    entry["description"] = json!(description);
                }
                if let Some(output_schema) = &t.output_schema {
                    entry["outputSchema"] = json!(output_schema);
                }
                if t.is_consequential {
                    entry["annotations"] = json!({ "destructiveHint": true });
                }
                entry
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn do_tools_call(&self, params: Value) -> McpResult<Value> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("missing 'name'"))?;
        let descriptor = self
            .registry
            .tool(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        let raw_args: RawArguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let enriched = enrich(raw_args, &descriptor.parameters)?;
        validate_against_declared_types(&enriched, &descriptor.parameters)?;

        // §4.H step 5: a thunk failure becomes `isError: true` in the
        // envelope, never a JSON-RPC error — transport and tool semantics
        // stay separate.
        let result = match (descriptor.invoke)(enriched).await {
            Ok(result) => result,
            Err(err) => CallToolResult::error(err.to_string()),
        };
        serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
    }

    fn do_resources_list(&self) -> Value {
        let resources: Vec<Value> = self
            .registry
            .list_resources()
            .into_iter()
            .flat_map(|r| {
                r.uri_templates
                    .iter()
                    .map(|uri| {
                        let mut entry = json!({ "uri": uri, "name": r.name });
                        if let Some(mime) = &r.mime_type {
                            entry["mimeType"] = json!(mime);
                        }
                        if let Some(description) = &r.description {
                            entry["description"] = json!(description);
                        }
                        entry
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        json!({ "resources": resources })
    }

    fn do_resources_templates_list(&self) -> Value {
        let templates: Vec<Value> = self
            .registry
            .list_resources()
            .into_iter()
            .flat_map(|r| r.uri_templates.clone())
            .filter(|uri| uri.contains('{'))
            .map(|uri| json!({ "uriTemplate": uri }))
            .collect();
        json!({ "resourceTemplates": templates })
    }

    async fn do_resources_read(&self, params: Value) -> McpResult<Value> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("missing 'uri'"))?;

        let matched = self
            .registry
            .match_resource_template(uri)
            .map_err(|e| McpError::internal(e.to_string()))?;

        let contents = if let Some((descriptor, bindings)) = matched {
            let raw_args: RawArguments = bindings.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
            let enriched = enrich(raw_args, &descriptor.parameters)?;
            validate_against_declared_types(&enriched, &descriptor.parameters)?;
            (descriptor.invoke)(enriched).await?
        } else if let Some(fallback) = &self.resource_fallback {
            fallback(uri.to_string()).await?
        } else {
            Vec::new()
        };

        if contents.is_empty() {
            return Err(McpError::ResourceNotFound(uri.to_string()));
        }

        Ok(json!({ "contents": contents }))
    }

    fn do_prompts_list(&self) -> Value {
        let prompts: Vec<Value> = self
            .registry
            .list_prompts()
            .into_iter()
            .map(|p| {
                let mut entry = json!({ "name": p.name });
                if let Some(description) = &p.description {
                    entry["description"] = json!(description);
                }
                if !p.parameters.is_empty() {
                    entry["arguments"] = json!(p
                        .parameters
                        .iter()
                        .map(|param| json!({
                            "name": param.label,
                            "description": param.description,
                            "required": param.is_required(),
                        }))
                        .collect::<Vec<_>>());
                }
                entry
            })
            .collect();
        json!({ "prompts": prompts })
    }

    async fn do_prompts_get(&self, params: Value) -> McpResult<Value> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("missing 'name'"))?;
        let descriptor = self
            .registry
            .prompt(name)
            .ok_or_else(|| McpError::UnknownPrompt(name.to_string()))?;

        let raw_args: RawArguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        let enriched = enrich(raw_args, &descriptor.parameters)?;
        validate_against_declared_types(&enriched, &descriptor.parameters)?;

        let result: GetPromptResult = (descriptor.invoke)(enriched).await?;
        serde_json::to_value(result).map_err(|e| McpError::internal(e.to_string()))
    }

    fn do_completion(&self, params: Value) -> Value {
        let prefix = params.get("argument").and_then(|a| a.get("value")).and_then(Value::as_str).unwrap_or("");
        let parameter_name = params
            .get("argument")
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("");

        if let Some(hook) = &self.completion_override {
            if let Some(values) = hook(parameter_name, prefix) {
                return json!({ "completion": { "values": values, "total": values.len() } });
            }
        }

        let labels = self.enum_labels_for(parameter_name);
        let mut ranked: Vec<(usize, usize, String)> = labels
            .into_iter()
            .enumerate()
            .map(|(order, label)| (common_prefix_len(prefix, &label), order, label))
            .filter(|(len, _, _)| *len > 0 || prefix.is_empty())
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        let values: Vec<String> = ranked.into_iter().map(|(_, _, label)| label).collect();
        json!({ "completion": { "values": values, "total": values.len() } })
    }

    fn enum_labels_for(&self, parameter_name: &str) -> Vec<String> {
        for tool in self.registry.list_tools() {
            for param in &tool.parameters {
                if param.label == parameter_name {
                    if let mcpforge_schema::JsonSchema::Enum { values, .. } = &param.schema {
                        return values.clone();
                    }
                }
            }
        }
        Vec::new()
    }

    fn do_set_level(&self, session: &Arc<Session>, params: Value) -> McpResult<Value> {
        let level = params
            .get("level")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::invalid_params("missing 'level'"))?;
        let level = match level {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "notice" => LogLevel::Notice,
            "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            other => return Err(McpError::invalid_enum_value("level", &["debug".into(), "info".into(), "notice".into(), "warning".into(), "error".into()], other)),
        };
        session.set_log_level(level);
        Ok(json!({}))
    }
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// A light structural pass beyond `enrich`'s default-filling: re-coerces
/// every declared parameter so `tools/call`/`prompts/get` surface
/// `InvalidParams` before the thunk ever sees a malformed value.
fn validate_against_declared_types(
    args: &RawArguments,
    parameters: &[mcpforge_registry::ParameterDescriptor],
) -> McpResult<()> {
    for param in parameters {
        let Some(value) = args.get(&param.label) else {
            continue;
        };
        match &param.schema {
            mcpforge_schema::JsonSchema::Number { .. } => {
                coercion::coerce_float(&param.label, value)?;
            }
            mcpforge_schema::JsonSchema::Boolean { .. } => {
                coercion::coerce_boolean(&param.label, value)?;
            }
            mcpforge_schema::JsonSchema::String { meta } if meta.format.as_deref() != Some("byte") => {
                coercion::coerce_string(&param.label, value)?;
            }
            mcpforge_schema::JsonSchema::Enum { values, .. } => {
                coercion::coerce_enum(&param.label, value, values)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Pushes a `notifications/message` log event through the ambient session,
/// for thunks that want to emit progress without failing the call.
pub fn emit_log(level: LogLevel, message: impl Into<String>) {
    if let Some(session) = crate::session::try_current_session() {
        session.push(PushEvent::Log {
            level,
            message: message.into(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_registry::{ParameterDescriptor, ToolDescriptor};
    use mcpforge_schema::JsonSchema;
    use mcpforge_types::{JsonRpcVersion, RequestId};
    use std::sync::Arc as StdArc;

    fn test_engine() -> (Engine, Arc<Session>) {
        let registry = Arc::new(CapabilityRegistry::new());
        registry
            .register_tool(ToolDescriptor {
                name: "add".into(),
                description: Some("adds two numbers".into()),
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
                        default_value: None,
                        schema: JsonSchema::number(),
                    },
                ],
                output_schema: None,
                is_consequential: false,
                invoke: StdArc::new(|args| {
                    Box::pin(async move {
                        let a = args.get("a").and_then(Value::as_f64).unwrap_or(0.0);
                        let b = args.get("b").and_then(Value::as_f64).unwrap_or(0.0);
                        Ok(CallToolResult::success(vec![Content::text((a + b).to_string())], None))
                    })
                }),
            })
            .unwrap();
        registry
            .register_resource(mcpforge_registry::ResourceDescriptor {
                name: "user_greeting".into(),
                uri_templates: vec!["users://{user_id}/greeting".into()],
                description: None,
                parameters: vec![ParameterDescriptor {
                    name: "user_id".into(),
                    label: "user_id".into(),
                    description: None,
                    default_value: None,
                    schema: JsonSchema::string(),
                }],
                mime_type: Some("text/plain".into()),
                invoke: StdArc::new(|args| {
                    Box::pin(async move {
                        let id = args.get("user_id").and_then(Value::as_str).unwrap_or_default().to_string();
                        Ok(vec![mcpforge_types::ResourceContents::text(
                            format!("users://{id}/greeting"),
                            Some("text/plain".into()),
                            format!("Hello, user #{id}!"),
                        )])
                    })
                }),
            })
            .unwrap();

        let engine = Engine::new(registry, Arc::new(ServerConfig::default()), Implementation::new("test", "1"));
        let (session, _rx) = Session::new("s1");
        (engine, session)
    }

    fn req(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: JsonRpcVersion,
            method: method.to_string(),
            params: Some(params),
            id: RequestId::Number(id),
        }
    }

    #[tokio::test]
    async fn tools_list_before_initialize_is_not_initialized() {
        let (engine, session) = test_engine();
        let response = engine
            .dispatch(&session, IncomingMessage::Request(req(7, "tools/list", json!({}))))
            .await
            .unwrap();
        assert!(response.is_error());
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["error"]["code"], -32002);
    }

    #[tokio::test]
    async fn initialize_then_tools_call_adds_numbers() {
        let (engine, session) = test_engine();
        engine
            .dispatch(
                &session,
                IncomingMessage::Request(req(
                    1,
                    "initialize",
                    json!({ "protocolVersion": "2024-11-05", "clientInfo": { "name": "t", "version": "1" } }),
                )),
            )
            .await;

        let response = engine
            .dispatch(
                &session,
                IncomingMessage::Request(req(2, "tools/call", json!({ "name": "add", "arguments": { "a": 2, "b": 3 } }))),
            )
            .await
            .unwrap();
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["result"]["content"][0]["text"], "5");
    }

    #[tokio::test]
    async fn missing_required_argument_is_invalid_params() {
        let (engine, session) = test_engine();
        engine
            .dispatch(
                &session,
                IncomingMessage::Request(req(
                    1,
                    "initialize",
                    json!({ "protocolVersion": "2024-11-05", "clientInfo": { "name": "t", "version": "1" } }),
                )),
            )
            .await;
        let response = engine
            .dispatch(
                &session,
                IncomingMessage::Request(req(3, "tools/call", json!({ "name": "add", "arguments": { "a": 2 } }))),
            )
            .await
            .unwrap();
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["error"]["code"], -32602);
        assert!(encoded["error"]["message"].as_str().unwrap().contains('b'));
    }

    #[tokio::test]
    async fn resources_read_matches_template_and_renders_greeting() {
        let (engine, session) = test_engine();
        engine
            .dispatch(
                &session,
                IncomingMessage::Request(req(
                    1,
                    "initialize",
                    json!({ "protocolVersion": "2024-11-05", "clientInfo": { "name": "t", "version": "1" } }),
                )),
            )
            .await;
        let response = engine
            .dispatch(
                &session,
                IncomingMessage::Request(req(4, "resources/read", json!({ "uri": "users://42/greeting" }))),
            )
            .await
            .unwrap();
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["result"]["contents"][0]["text"], "Hello, user #42!");
    }

    #[tokio::test]
    async fn second_initialize_is_invalid_request() {
        let (engine, session) = test_engine();
        let init = json!({ "protocolVersion": "2024-11-05", "clientInfo": { "name": "t", "version": "1" } });
        engine
            .dispatch(&session, IncomingMessage::Request(req(1, "initialize", init.clone())))
            .await;
        let response = engine
            .dispatch(&session, IncomingMessage::Request(req(2, "initialize", init)))
            .await
            .unwrap();
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["error"]["code"], -32600);
    }
}
