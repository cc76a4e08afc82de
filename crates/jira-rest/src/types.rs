//! Cleaned issue-tracker data types and the client error type.
//!
//! Jira responses are large and deeply nested. The client reduces them to
//! the flat shapes below before handing them to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A condensed issue with its comments and links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanedIssue {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created: Option<String>,
    pub updated: Option<String>,
    pub labels: Vec<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueRef>,
    pub comments: Vec<CleanedComment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_issues: Vec<RelatedIssue>,
}

/// A short reference to another issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRef {
    pub key: String,
    pub summary: Option<String>,
}

/// An issue link, described from the point of view of the current issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedIssue {
    pub key: String,
    pub summary: Option<String>,
    pub relationship: String,
}

/// A comment with its body flattened to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedComment {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub created: Option<String>,
    pub updated: Option<String>,
}

/// Result of a JQL search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total: u64,
    pub issues: Vec<CleanedIssue>,
}

/// A workflow transition available on an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<StatusRef>,
}

/// Target status of a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRef {
    pub id: Option<String>,
    pub name: String,
}

/// Identifiers returned when an issue is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self")]
    pub self_url: String,
}

/// An uploaded attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

// ---- raw wire shapes -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: RawFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub status: Option<Named>,
    #[serde(default)]
    pub issuetype: Option<Named>,
    #[serde(default)]
    pub priority: Option<Named>,
    #[serde(default)]
    pub assignee: Option<RawUser>,
    #[serde(default)]
    pub reporter: Option<RawUser>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub parent: Option<RawParent>,
    #[serde(default)]
    pub comment: Option<RawCommentPage>,
    #[serde(default)]
    pub issuelinks: Vec<RawIssueLink>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawUser {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl RawUser {
    pub fn label(&self) -> Option<String> {
        self.display_name.clone().or_else(|| self.name.clone())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawParent {
    pub key: String,
    #[serde(default)]
    pub fields: Option<RawSummaryOnly>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSummaryOnly {
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCommentPage {
    #[serde(default)]
    pub comments: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComment {
    pub id: String,
    #[serde(default)]
    pub author: Option<RawUser>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawIssueLink {
    #[serde(rename = "type")]
    pub link_type: RawLinkType,
    #[serde(default)]
    pub inward_issue: Option<RawParent>,
    #[serde(default)]
    pub outward_issue: Option<RawParent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLinkType {
    #[serde(default)]
    pub inward: Option<String>,
    #[serde(default)]
    pub outward: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSearch {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTransitions {
    #[serde(default)]
    pub transitions: Vec<RawTransition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTransition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub to: Option<RawStatus>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStatus {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawAttachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Jira's standard error body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawErrorBody {
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: serde_json::Map<String, Value>,
}

impl RawErrorBody {
    /// Flatten `errorMessages` and per-field `errors` into one line.
    pub fn summarize(&self) -> Option<String> {
        let mut parts: Vec<String> = self.error_messages.clone();
        for (field, msg) in &self.errors {
            match msg.as_str() {
                Some(text) => parts.push(format!("{field}: {text}")),
                None => parts.push(format!("{field}: {msg}")),
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Errors returned by the REST client.
#[derive(thiserror::Error, Debug)]
pub enum JiraError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jira API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Convenience result type.
pub type JiraResult<T> = Result<T, JiraError>;
