//! Tool `add_attachment`: Upload a base64-encoded file to an issue.

use base64::Engine as _;
use jira_rest::JiraClient;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{invalid, parse_args, present};

const MISSING: &str = "issueKey, fileContent, and filename are required";
const REQUIRED: &[&str] = &["issueKey", "fileContent", "filename"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentParams {
    issue_key: Option<String>,
    file_content: Option<String>,
    filename: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "add_attachment".to_string(),
        description: Some("Add a file attachment to a JIRA issue".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "issueKey": {
                    "type": "string",
                    "description": "The key of the issue to add attachment to"
                },
                "fileContent": {
                    "type": "string",
                    "description": "Base64 encoded content of the file"
                },
                "filename": { "type": "string", "description": "Name of the file to be attached" }
            },
            "required": ["issueKey", "fileContent", "filename"],
            "additionalProperties": false
        }),
    }
}

pub async fn execute(args: Value, client: &JiraClient) -> McpResult<ToolCallResult> {
    let params: AttachmentParams = parse_args(args, REQUIRED, MISSING)?;
    let (Some(issue_key), Some(content), Some(filename)) = (
        present(params.issue_key),
        present(params.file_content),
        present(params.filename),
    ) else {
        return Err(invalid(MISSING));
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(content.trim())
        .map_err(|e| McpError::InvalidParams(format!("fileContent is not valid base64: {e}")))?;

    let attachment = client.add_attachment(&issue_key, bytes, &filename).await?;
    Ok(ToolCallResult::json(&json!({
        "message": format!("File {filename} attached successfully to issue {issue_key}"),
        "attachmentId": attachment.id,
        "filename": attachment.filename,
    })))
}
