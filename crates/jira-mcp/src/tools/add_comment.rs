//! Tool `add_comment`: Add a plain-text comment to an issue.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{invalid, parse_args, present};

const MISSING: &str = "issueIdOrKey and body are required";
const REQUIRED: &[&str] = &["issueIdOrKey", "body"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentParams {
    issue_id_or_key: Option<String>,
    body: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "add_comment".to_string(),
        description: Some("Add a comment to a JIRA issue".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "issueIdOrKey": {
                    "type": "string",
                    "description": "The ID or key of the issue to add the comment to"
                },
                "body": {
                    "type": "string",
                    "description": "The content of the comment (plain text)"
                }
            },
            "required": ["issueIdOrKey", "body"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: CommentParams = parse_args(args, REQUIRED, MISSING)?;
    let (Some(issue), Some(body)) = (present(params.issue_id_or_key), present(params.body)) else {
        return Err(invalid(MISSING));
    };

    let comment = client.add_comment(&issue, &body).await?;
    Ok(ToolCallResult::json(&comment))
}
