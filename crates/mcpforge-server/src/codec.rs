//! Parses a raw JSON-RPC text frame (line, HTTP body, or WebSocket message)
//! into one or more [`IncomingMessage`]s, and renders engine results back to
//! text. Shared by every transport so batching and the "notifications
//! receive no response" rule are implemented exactly once.

use mcpforge_types::{IncomingMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpError};
use serde_json::Value;

/// One parsed frame: either a single message or a JSON-RPC batch array.
pub enum Batch {
    Single(IncomingMessage),
    Many(Vec<IncomingMessage>),
}

/// Parses raw JSON text into a `Batch`. An empty batch array is itself a
/// protocol violation (`InvalidRequest`), per the JSON-RPC 2.0 spec.
pub fn parse_incoming(raw: &str) -> Result<Batch, McpError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| McpError::Parse(e.to_string()))?;
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(McpError::InvalidRequest("empty batch".to_string()));
            }
            let messages = items
                .into_iter()
                .map(parse_one)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Batch::Many(messages))
        }
        other => Ok(Batch::Single(parse_one(other)?)),
    }
}

fn parse_one(value: Value) -> Result<IncomingMessage, McpError> {
    if value.get("id").is_some() {
        let request: JsonRpcRequest =
            serde_json::from_value(value).map_err(|e| McpError::InvalidRequest(e.to_string()))?;
        Ok(IncomingMessage::Request(request))
    } else {
        let notification: JsonRpcNotification =
            serde_json::from_value(value).map_err(|e| McpError::InvalidRequest(e.to_string()))?;
        Ok(IncomingMessage::Notification(notification))
    }
}

/// Renders a set of responses for a batch. A batch consisting entirely of
/// notifications yields `None` (nothing is sent on the wire), matching the
/// single-message "no response for a notification" rule (spec §9).
pub fn render_batch(responses: Vec<JsonRpcResponse>) -> Option<Value> {
    if responses.is_empty() {
        None
    } else if responses.len() == 1 {
        Some(serde_json::to_value(&responses[0]).expect("JsonRpcResponse always serializes"))
    } else {
        Some(serde_json::to_value(&responses).expect("Vec<JsonRpcResponse> always serializes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id() {
        let batch = parse_incoming(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        match batch {
            Batch::Single(IncomingMessage::Notification(n)) => assert_eq!(n.method, "notifications/initialized"),
            _ => panic!("expected a notification"),
        }
    }

    #[test]
    fn empty_batch_is_invalid_request() {
        assert!(parse_incoming("[]").is_err());
    }

    #[test]
    fn mixed_batch_parses_both_kinds() {
        let batch = parse_incoming(
            r#"[{"jsonrpc":"2.0","method":"ping","id":1},{"jsonrpc":"2.0","method":"notifications/initialized"}]"#,
        )
        .unwrap();
        match batch {
            Batch::Many(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected a batch"),
        }
    }

    #[test]
    fn render_batch_of_notifications_only_is_none() {
        assert!(render_batch(vec![]).is_none());
    }
}
