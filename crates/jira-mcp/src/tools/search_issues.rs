//! Tool `search_issues`: Search issues with a JQL query.

use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpResult, ToolCallResult, ToolDefinition};

use super::{parse_args, required};

const MISSING: &str = "Search string is required";
const REQUIRED: &[&str] = &["searchString"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    search_string: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_issues".to_string(),
        description: Some("Search JIRA issues using JQL".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "searchString": { "type": "string", "description": "JQL search string" }
            },
            "required": ["searchString"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: SearchParams = parse_args(args, REQUIRED, MISSING)?;
    let jql = required(params.search_string, MISSING)?;

    let result = client.search_issues(&jql).await?;
    Ok(ToolCallResult::json(&result))
}
