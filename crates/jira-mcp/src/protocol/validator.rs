//! JSON-RPC message validation.

use crate::types::{JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

/// Validate that a JSON-RPC request is well-formed.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    if request.method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;

    #[test]
    fn test_rejects_wrong_version() {
        let req = JsonRpcRequest {
            jsonrpc: "1.0".into(),
            id: RequestId::Number(1),
            method: "ping".into(),
            params: None,
        };
        assert!(matches!(
            validate_request(&req),
            Err(McpError::InvalidRequest(_))
        ));
    }
}
