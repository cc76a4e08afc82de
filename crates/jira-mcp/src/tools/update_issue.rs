//! Tool `update_issue`: Update fields on an existing issue.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{invalid, parse_args, present};

const MISSING: &str = "issueKey and fields object are required";
const REQUIRED: &[&str] = &["issueKey", "fields"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateParams {
    issue_key: Option<String>,
    fields: Option<Map<String, Value>>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "update_issue".to_string(),
        description: Some("Update an existing JIRA issue".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "issueKey": { "type": "string", "description": "The key of the issue to update" },
                "fields": {
                    "type": "object",
                    "description": "Fields to update on the issue",
                    "additionalProperties": true
                }
            },
            "required": ["issueKey", "fields"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: UpdateParams = parse_args(args, REQUIRED, MISSING)?;
    let (Some(issue_key), Some(fields)) = (present(params.issue_key), params.fields) else {
        return Err(invalid(MISSING));
    };

    client.update_issue(&issue_key, fields).await?;
    Ok(ToolCallResult::json(&json!({
        "message": format!("Issue {issue_key} updated successfully")
    })))
}
