//! Request dispatcher. Receives JSON-RPC messages and routes them to handlers.

use std::sync::Arc;
use tokio::sync::Mutex;

use jira_rest::JiraClient;
use serde_json::Value;

use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::validate_request;

/// The protocol handler that dispatches incoming JSON-RPC messages.
///
/// One instance is bound to each transport engine; the Jira client is shared.
#[derive(Clone)]
pub struct ProtocolHandler {
    client: Arc<JiraClient>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
}

impl ProtocolHandler {
    pub fn new(client: Arc<JiraClient>) -> Self {
        Self {
            client,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
        }
    }

    /// Snapshot of what the client negotiated so far.
    pub async fn negotiated(&self) -> NegotiatedCapabilities {
        self.capabilities.lock().await.clone()
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!("Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        let result = self.dispatch_request(&request).await;

        match result {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!(method = %request.method, "Request failed: {e}");
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()).await,
            "ping" => Ok(Value::Object(serde_json::Map::new())),

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params.clone()).await,

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                self.capabilities.lock().await.mark_initialized();
            }
            "notifications/cancelled" => {
                let request_id = notification
                    .params
                    .and_then(|p| serde_json::from_value::<CancelRequestParams>(p).ok())
                    .map(|p| p.request_id.to_string())
                    .unwrap_or_default();
                tracing::info!(request_id, "Received cancellation notification");
            }
            _ => {
                tracing::debug!("Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let mut caps = self.capabilities.lock().await;
        let result = caps.negotiate(init_params)?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: ToolRegistry::list_tools(),
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        tracing::debug!(tool = %call_params.name, "Calling tool");
        let result =
            ToolRegistry::call(&call_params.name, call_params.arguments, &self.client).await?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jira_rest::{ApiFlavor, AuthScheme, JiraConfig};
    use serde_json::json;

    fn handler() -> ProtocolHandler {
        let client = JiraClient::new(JiraConfig {
            base_url: "http://127.0.0.1:9".into(),
            email: "dev@example.com".into(),
            api_token: "tok".into(),
            auth: AuthScheme::Basic,
            flavor: ApiFlavor::Cloud,
        })
        .unwrap();
        ProtocolHandler::new(Arc::new(client))
    }

    fn message(value: Value) -> JsonRpcMessage {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_initialize_then_list_tools() {
        let handler = handler();
        let init = handler
            .handle_message(message(json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": {
                    "protocolVersion": "2025-06-18",
                    "capabilities": {},
                    "clientInfo": { "name": "inspector", "version": "0.1" }
                }
            })))
            .await
            .unwrap();
        assert_eq!(init["result"]["serverInfo"]["name"], "jira-mcp");

        let none = handler
            .handle_message(message(
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            ))
            .await;
        assert!(none.is_none());
        assert!(handler.negotiated().await.initialized);

        let list = handler
            .handle_message(message(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})))
            .await
            .unwrap();
        assert_eq!(list["result"]["tools"].as_array().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_unknown_method_and_tool() {
        let handler = handler();
        let resp = handler
            .handle_message(message(json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"})))
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], -32601);

        let resp = handler
            .handle_message(message(json!({
                "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "delete_everything", "arguments": {} }
            })))
            .await
            .unwrap();
        assert_eq!(resp["error"]["code"], -32601);
        assert_eq!(resp["error"]["message"], "Unknown tool: delete_everything");
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid_params() {
        let handler = handler();
        let resp = handler
            .handle_message(message(json!({
                "jsonrpc": "2.0", "id": "x", "method": "tools/call",
                "params": { "name": "get_issue", "arguments": {} }
            })))
            .await
            .unwrap();
        assert_eq!(resp["id"], "x");
        assert_eq!(resp["error"]["code"], -32602);
        assert_eq!(resp["error"]["message"], "Issue ID is required");
    }
}
