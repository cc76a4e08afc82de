//! Error types and JSON-RPC error codes for the MCP server.

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Server-defined codes used by the HTTP transport.
pub mod mcp_error_codes {
    /// Transport-level rejection (bad session, wrong method, bad headers).
    pub const SERVER_ERROR: i32 = -32000;
    pub const SESSION_NOT_FOUND: i32 = -32001;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Rendered verbatim as the message of a `-32000` envelope.
    #[error("{0}")]
    ServerError(String),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Jira(#[from] jira_rest::JiraError),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::ServerError(_) => SERVER_ERROR,
            McpError::SessionNotFound => SESSION_NOT_FOUND,
            McpError::InternalError(_)
            | McpError::Transport(_)
            | McpError::Config(_)
            | McpError::Io(_)
            | McpError::Jira(_) => INTERNAL_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: None,
            },
            id,
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_errors_map_to_codes() {
        let unknown = McpError::ToolNotFound("nope".into());
        assert_eq!(unknown.code(), error_codes::METHOD_NOT_FOUND);
        assert_eq!(unknown.to_string(), "Unknown tool: nope");

        let invalid = McpError::InvalidParams("Issue ID is required".into());
        let rpc = invalid.to_json_rpc_error(RequestId::Number(3));
        assert_eq!(rpc.error.code, -32602);
        assert_eq!(rpc.error.message, "Issue ID is required");
    }

    #[test]
    fn test_upstream_errors_are_internal() {
        let err: McpError = jira_rest::JiraError::Api {
            status: 404,
            message: "Issue does not exist".into(),
        }
        .into();
        assert_eq!(err.code(), error_codes::INTERNAL_ERROR);
        assert!(err.to_string().contains("Issue does not exist"));
    }
}
