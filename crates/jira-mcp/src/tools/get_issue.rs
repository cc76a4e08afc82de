//! Tool `get_issue`: One issue with comments and links.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, required};

const MISSING: &str = "Issue ID is required";
const REQUIRED: &[&str] = &["issueId"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetIssueParams {
    issue_id: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_issue".to_string(),
        description: Some(
            "Get detailed information about a specific JIRA issue including comments".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "issueId": { "type": "string", "description": "The ID or key of the JIRA issue" }
            },
            "required": ["issueId"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: GetIssueParams = parse_args(args, REQUIRED, MISSING)?;
    let issue_id = required(params.issue_id, MISSING)?;

    let issue = client.get_issue_with_comments(&issue_id).await?;
    Ok(ToolCallResult::json(&issue))
}
