//! HTTP + Server-Sent-Events transport (spec §4.J). Grounded on the
//! teacher's older `transport/http.rs` (`SessionManager`, the `GET /sse`
//! broadcast stream, `run_with_config`'s rate-limited POST handler) rather
//! than the newer POST-only `v3/transport/http.rs` — SSE push is only
//! wired up in the former.
//!
//! One SSE connection is one session; its push channel feeds `event:
//! message` frames, and the server hands the client a per-connection POST
//! URL via one `event: endpoint` frame up front. `axum`'s built-in
//! `Sse::keep_alive` supplies the 30s keep-alive comment, so this module
//! only has to bridge `Session`'s `mpsc::Receiver<PushEvent>` into a
//! `Stream<Item = Result<Event, Infallible>>`.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use mcpforge_server::{parse_incoming, McpServer, PushEvent, Session};
use mcpforge_types::McpError;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

const SSE_KEEP_ALIVE_SECS: u64 = 30;

/// Outcome of the pluggable bearer-auth predicate (spec §4.J).
pub enum AuthOutcome {
    Authorized,
    Unauthorized(String),
}

/// Receives the bearer token (or `None` if the request carried none) and
/// decides whether the request may proceed. Absent a predicate, every
/// request is authorized (fail-open when auth is unconfigured, per
/// the decision recorded in the grounding ledger).
pub type AuthPredicate = Arc<dyn Fn(Option<&str>) -> AuthOutcome + Send + Sync>;

/// Options controlling one HTTP listener.
#[derive(Clone)]
pub struct HttpOptions {
    pub auth: Option<AuthPredicate>,
    /// Serves `GET /openapi.json` and `GET /.well-known/ai-plugin.json`
    /// when set (spec §4.J: "disabled by default").
    pub openapi_enabled: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            auth: None,
            openapi_enabled: false,
        }
    }
}

/// Live SSE sessions, keyed by session id, so a `POST {endpoint}` can find
/// the session its `GET /sse` connection created.
#[derive(Default)]
struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    fn insert(&self, id: String, session: Arc<Session>) {
        self.sessions.insert(id, session);
    }

    fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    fn remove(&self, id: &str) {
        self.sessions.remove(id);
    }
}

#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
    sessions: Arc<SessionRegistry>,
    options: HttpOptions,
}

/// Binds `addr` and serves `GET /sse`, `POST /rpc/{session_id}`, and
/// (when enabled) the OpenAPI projection endpoints until the listener
/// errors or the process is signalled to stop.
pub async fn run_http(server: Arc<McpServer>, addr: SocketAddr, options: HttpOptions) -> Result<(), McpError> {
    let state = AppState {
        server,
        sessions: Arc::new(SessionRegistry::default()),
        options,
    };

    let mut router = Router::new()
        .route("/sse", get(handle_sse))
        .route("/rpc/{session_id}", post(handle_post));

    if state.options.openapi_enabled {
        router = router
            .route("/openapi.json", get(handle_openapi))
            .route("/.well-known/ai-plugin.json", get(handle_ai_plugin));
    }

    let router = router.with_state(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| McpError::internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "http+sse transport listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|e| McpError::internal(format!("http server error: {e}")))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn authorize(options: &HttpOptions, headers: &HeaderMap) -> Result<(), StatusCode> {
    let Some(predicate) = &options.auth else {
        return Ok(());
    };
    let token = bearer_token(headers);
    match predicate(token.as_deref()) {
        AuthOutcome::Authorized => Ok(()),
        AuthOutcome::Unauthorized(reason) => {
            tracing::warn!(reason, "http request rejected: unauthorized");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

async fn handle_sse(State(state): State<AppState>, headers: HeaderMap) -> axum::response::Response {
    if let Err(status) = authorize(&state.options, &headers) {
        return status.into_response();
    }

    let session_id = uuid::Uuid::new_v4().to_string();
    let (session, push_rx) = Session::new(session_id.clone());
    state.sessions.insert(session_id.clone(), session);

    let endpoint = format!("/rpc/{session_id}");
    let endpoint_event = futures::stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });
    let message_events = ReceiverStream::new(push_rx)
        .map(|event| Ok::<_, Infallible>(Event::default().event("message").data(push_event_payload(event))));

    let stream = CleanupStream {
        inner: Box::pin(endpoint_event.chain(message_events)),
        sessions: state.sessions.clone(),
        session_id,
    };

    let sse = Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    );
    sse.into_response()
}

/// Wraps the endpoint+message event stream so the SSE session is dropped
/// from the registry as soon as the client disconnects (mirrors the
/// teacher's `CleanupStream`, which can't `.await` in `Drop` either).
struct CleanupStream {
    inner: Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>,
    sessions: Arc<SessionRegistry>,
    session_id: String,
}

impl Stream for CleanupStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for CleanupStream {
    fn drop(&mut self) {
        let sessions = self.sessions.clone();
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            sessions.remove(&session_id);
        });
    }
}

fn push_event_payload(event: PushEvent) -> String {
    let (method, params) = match event {
        PushEvent::Log { level, message } => (
            "notifications/message",
            serde_json::json!({ "level": format!("{level:?}").to_lowercase(), "data": message }),
        ),
        PushEvent::Progress { progress, total, message } => (
            "notifications/progress",
            serde_json::json!({ "progress": progress, "total": total, "message": message }),
        ),
        PushEvent::ResourcesListChanged => ("notifications/resources/list_changed", serde_json::json!({})),
    };
    let notification = mcpforge_types::JsonRpcNotification::new(method, Some(params));
    serde_json::to_string(&notification).expect("notification serializes")
}

async fn handle_post(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    body: String,
) -> axum::response::Response {
    if let Err(status) = authorize(&state.options, &headers) {
        return status.into_response();
    }

    let Some(session) = state.sessions.get(&session_id) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    match parse_incoming(body.trim()) {
        Ok(batch) => match state.server.engine.dispatch_frame(&session, batch).await {
            Some(rendered) => (
                StatusCode::OK,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                serde_json::to_string(&rendered).expect("value serializes"),
            )
                .into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        },
        Err(err) => {
            let response = mcpforge_types::JsonRpcResponse::error(
                mcpforge_types::ResponseId::null(),
                err.to_jsonrpc_error(None),
            );
            (
                StatusCode::BAD_REQUEST,
                [(axum::http::header::CONTENT_TYPE, "application/json")],
                serde_json::to_string(&response).expect("JsonRpcResponse serializes"),
            )
                .into_response()
        }
    }
}

/// Projects the tool registry as a minimal OpenAPI 3.0 document (spec
/// §6: "for each tool, an HTTP POST operation at `/<server-name>/<tool-name>`").
async fn handle_openapi(State(state): State<AppState>) -> axum::response::Json<serde_json::Value> {
    let server_name = &state.server.config.name;
    let mut paths = serde_json::Map::new();
    for tool in state.server.engine.registry.list_tools() {
        let path = format!("/{server_name}/{}", tool.name);
        let request_schema = serde_json::to_value(tool.input_schema()).unwrap_or(serde_json::Value::Null);
        let response_schema = tool
            .output_schema
            .clone()
            .and_then(|schema| serde_json::to_value(schema).ok())
            .unwrap_or(serde_json::json!({"type": "object"}));
        paths.insert(
            path,
            serde_json::json!({
                "post": {
                    "summary": tool.description.clone().unwrap_or_default(),
                    "operationId": tool.name,
                    "requestBody": {
                        "required": true,
                        "content": { "application/json": { "schema": request_schema } }
                    },
                    "responses": {
                        "200": {
                            "description": "Tool result",
                            "content": { "application/json": { "schema": response_schema } }
                        }
                    }
                }
            }),
        );
    }

    axum::response::Json(serde_json::json!({
        "openapi": "3.0.3",
        "info": { "title": server_name, "version": state.server.config.version },
        "paths": paths,
    }))
}

async fn handle_ai_plugin(State(state): State<AppState>) -> axum::response::Json<serde_json::Value> {
    axum::response::Json(serde_json::json!({
        "schema_version": "v1",
        "name_for_model": state.server.config.name,
        "description_for_model": state.server.config.description.clone().unwrap_or_default(),
        "api": { "type": "openapi", "url": "/openapi.json" },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_server::ServerBuilder;

    #[test]
    fn default_options_disable_auth_and_openapi() {
        let options = HttpOptions::default();
        assert!(options.auth.is_none());
        assert!(!options.openapi_enabled);
    }

    #[test]
    fn missing_bearer_header_yields_none() {
        let headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer abc123".parse().unwrap());
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn unconfigured_auth_is_fail_open() {
        let options = HttpOptions::default();
        let headers = HeaderMap::new();
        assert!(authorize(&options, &headers).is_ok());
    }

    #[test]
    fn session_registry_round_trips() {
        let registry = SessionRegistry::default();
        let (session, _rx) = Session::new("s1");
        registry.insert("s1".to_string(), session);
        assert!(registry.get("s1").is_some());
        registry.remove("s1");
        assert!(registry.get("s1").is_none());
    }

    #[test]
    fn openapi_disabled_by_default_matches_builder_defaults() {
        let server = ServerBuilder::new().build().unwrap();
        assert_eq!(server.config.name, "mcpforge-server");
    }
}
