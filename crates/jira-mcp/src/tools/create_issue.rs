//! Tool `create_issue`: Create a new issue.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{invalid, parse_args, present};

const MISSING: &str = "projectKey, issueType, and summary are required";
const REQUIRED: &[&str] = &["projectKey", "issueType", "summary"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    project_key: Option<String>,
    issue_type: Option<String>,
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    fields: Option<Map<String, Value>>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "create_issue".to_string(),
        description: Some("Create a new JIRA issue".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "projectKey": {
                    "type": "string",
                    "description": "The project key where the issue will be created"
                },
                "issueType": {
                    "type": "string",
                    "description": "The type of issue to create (e.g., \"Bug\", \"Story\", \"Task\")"
                },
                "summary": { "type": "string", "description": "The issue summary/title" },
                "description": { "type": "string", "description": "The issue description" },
                "fields": {
                    "type": "object",
                    "description": "Additional fields to set on the issue",
                    "additionalProperties": true
                }
            },
            "required": ["projectKey", "issueType", "summary"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: CreateParams = parse_args(args, REQUIRED, MISSING)?;
    let (Some(project_key), Some(issue_type), Some(summary)) = (
        present(params.project_key),
        present(params.issue_type),
        present(params.summary),
    ) else {
        return Err(invalid(MISSING));
    };

    let created = client
        .create_issue(
            &project_key,
            &issue_type,
            &summary,
            params.description.as_deref(),
            params.fields,
        )
        .await?;
    Ok(ToolCallResult::json(&created))
}
