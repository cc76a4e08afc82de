//! Tool `get_epic_children`: Child issues of an epic, with comments.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, required};

const MISSING: &str = "Epic key is required";
const REQUIRED: &[&str] = &["epicKey"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpicParams {
    epic_key: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_epic_children".to_string(),
        description: Some("Get all child issues in an epic including their comments".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "epicKey": { "type": "string", "description": "The key of the epic issue" }
            },
            "required": ["epicKey"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: EpicParams = parse_args(args, REQUIRED, MISSING)?;
    let epic_key = required(params.epic_key, MISSING)?;

    let children = client.get_epic_children(&epic_key).await?;
    Ok(ToolCallResult::json(&children))
}
