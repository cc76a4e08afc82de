//! Tool `transition_issue`: Move an issue through its workflow.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{invalid, parse_args, present};

const MISSING: &str = "issueKey and transitionId are required";
const REQUIRED: &[&str] = &["issueKey", "transitionId"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransitionParams {
    issue_key: Option<String>,
    transition_id: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "transition_issue".to_string(),
        description: Some(
            "Change the status of a JIRA issue by performing a transition".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "issueKey": { "type": "string", "description": "The key of the issue to transition" },
                "transitionId": {
                    "type": "string",
                    "description": "The ID of the transition to perform"
                },
                "comment": {
                    "type": "string",
                    "description": "Optional comment to add with the transition"
                }
            },
            "required": ["issueKey", "transitionId"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: TransitionParams = parse_args(args, REQUIRED, MISSING)?;
    let (Some(issue_key), Some(transition_id)) =
        (present(params.issue_key), present(params.transition_id))
    else {
        return Err(invalid(MISSING));
    };
    let comment = present(params.comment);

    client
        .transition_issue(&issue_key, &transition_id, comment.as_deref())
        .await?;

    let suffix = if comment.is_some() { " with comment" } else { "" };
    Ok(ToolCallResult::json(&json!({
        "message": format!("Issue {issue_key} transitioned successfully{suffix}")
    })))
}
