//! Message framing: newline-delimited JSON for stdio, SSE events and
//! single-or-batch bodies for HTTP.

use bytes::Bytes;
use serde_json::Value;

use crate::types::{JsonRpcMessage, McpError, McpResult};

/// Parse a single line of text as a JSON-RPC message.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Parse an HTTP body that is either one message or a non-empty array of them.
pub fn parse_batch(body: Value) -> McpResult<Vec<JsonRpcMessage>> {
    match body {
        Value::Array(items) => {
            if items.is_empty() {
                return Err(McpError::ParseError("Empty batch".to_string()));
            }
            items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item).map_err(|e| McpError::ParseError(e.to_string()))
                })
                .collect()
        }
        other => serde_json::from_value(other)
            .map(|msg| vec![msg])
            .map_err(|e| McpError::ParseError(e.to_string())),
    }
}

/// True when the raw body is a single `initialize` request. Batches never
/// open a session.
pub fn is_initialize_request(body: &Value) -> bool {
    body.get("method").and_then(Value::as_str) == Some("initialize") && body.get("id").is_some()
}

/// Serialize a value to a JSON line (with trailing newline).
pub fn frame_message(value: &Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value).map_err(McpError::Json)?;
    json.push('\n');
    Ok(json)
}

/// Serialize a value as one server-sent `message` event.
pub fn frame_event(value: &Value) -> McpResult<Bytes> {
    let json = serde_json::to_string(value).map_err(McpError::Json)?;
    Ok(Bytes::from(format!("event: message\ndata: {json}\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_batch_accepts_single_and_array() {
        let single = parse_batch(json!({"jsonrpc":"2.0","id":1,"method":"ping"})).unwrap();
        assert_eq!(single.len(), 1);

        let batch = parse_batch(json!([
            {"jsonrpc":"2.0","id":1,"method":"ping"},
            {"jsonrpc":"2.0","method":"notifications/initialized"}
        ]))
        .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(!batch[1].is_request());
    }

    #[test]
    fn test_parse_batch_rejects_garbage() {
        assert!(parse_batch(json!([])).is_err());
        assert!(parse_batch(json!({"hello": "world"})).is_err());
        assert!(parse_batch(json!(42)).is_err());
    }

    #[test]
    fn test_is_initialize_request() {
        assert!(is_initialize_request(&json!({"jsonrpc":"2.0","id":1,"method":"initialize"})));
        assert!(!is_initialize_request(&json!([{"jsonrpc":"2.0","id":1,"method":"initialize"}])));
        assert!(!is_initialize_request(&json!({"jsonrpc":"2.0","method":"initialize"})));
        assert!(!is_initialize_request(&json!({"jsonrpc":"2.0","id":1,"method":"tools/list"})));
    }

    #[test]
    fn test_frame_event() {
        let bytes = frame_event(&json!({"a": 1})).unwrap();
        assert_eq!(&bytes[..], b"event: message\ndata: {\"a\":1}\n\n");
    }
}
