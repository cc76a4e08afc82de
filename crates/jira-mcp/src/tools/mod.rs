//! MCP tool implementations.

pub mod add_attachment;
pub mod add_comment;
pub mod create_issue;
pub mod get_epic_children;
pub mod get_issue;
pub mod get_transitions;
pub mod registry;
pub mod search_issues;
pub mod transition_issue;
pub mod update_issue;

pub use registry::ToolRegistry;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::types::{McpError, McpResult};

/// Deserialize tool arguments. A missing or mistyped `required` field becomes
/// `message`; a mistyped optional field is reported as such.
pub(crate) fn parse_args<T: DeserializeOwned>(
    args: Value,
    required: &[&str],
    message: &str,
) -> McpResult<T> {
    let err = match T::deserialize(&args) {
        Ok(params) => return Ok(params),
        Err(e) => e,
    };
    let Value::Object(map) = args else {
        return Err(invalid(message));
    };

    // Retry without the required fields to see which side the error is on.
    let optional: Map<String, Value> = map
        .into_iter()
        .filter(|(key, _)| !required.contains(&key.as_str()))
        .collect();
    match T::deserialize(&Value::Object(optional)) {
        Ok(_) => Err(invalid(message)),
        Err(_) => Err(McpError::InvalidParams(format!("Invalid arguments: {err}"))),
    }
}

/// Empty strings count as missing.
pub(crate) fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

pub(crate) fn required(value: Option<String>, message: &str) -> McpResult<String> {
    present(value).ok_or_else(|| invalid(message))
}

pub(crate) fn invalid(message: &str) -> McpError {
    McpError::InvalidParams(message.to_string())
}
