//! Tool `get_transitions`: Status transitions available for an issue.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, required};

const MISSING: &str = "Issue key is required";
const REQUIRED: &[&str] = &["issueKey"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitionsParams {
    issue_key: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_transitions".to_string(),
        description: Some("Get available status transitions for a JIRA issue".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "issueKey": {
                    "type": "string",
                    "description": "The key of the issue to get transitions for"
                }
            },
            "required": ["issueKey"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: TransitionsParams = parse_args(args, REQUIRED, MISSING)?;
    let issue_key = required(params.issue_key, MISSING)?;

    let transitions = client.get_transitions(&issue_key).await?;
    Ok(ToolCallResult::json(&transitions))
}
