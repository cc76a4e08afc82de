//! Tool registration and dispatch.

use jira_rest::JiraClient;
use serde_json::Value;

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{
    add_attachment, add_comment, create_issue, get_epic_children, get_issue, get_transitions,
    search_issues, transition_issue, update_issue,
};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            search_issues::definition(),
            get_epic_children::definition(),
            get_issue::definition(),
            create_issue::definition(),
            update_issue::definition(),
            get_transitions::definition(),
            transition_issue::definition(),
            add_attachment::definition(),
            add_comment::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        client: &JiraClient,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "search_issues" => search_issues::execute(args, client).await,
            "get_epic_children" => get_epic_children::execute(args, client).await,
            "get_issue" => get_issue::execute(args, client).await,
            "create_issue" => create_issue::execute(args, client).await,
            "update_issue" => update_issue::execute(args, client).await,
            "get_transitions" => get_transitions::execute(args, client).await,
            "transition_issue" => transition_issue::execute(args, client).await,
            "add_attachment" => add_attachment::execute(args, client).await,
            "add_comment" => add_comment::execute(args, client).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
