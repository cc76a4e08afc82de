//! Async Jira REST client wrapping reqwest.
//!
//! One client type serves both API dialects; the [`ApiFlavor`] policy
//! rewrites paths and encodes rich text, everything else is shared.

use std::str::FromStr;
use std::time::Duration;

use base64::Engine;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::adf;
use crate::flavor::ApiFlavor;
use crate::types::*;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const SEARCH_MAX_RESULTS: u32 = 50;
const ISSUE_FIELDS: &str =
    "summary,description,status,issuetype,priority,assignee,reporter,created,updated,labels,parent,comment,issuelinks";

/// How requests authenticate against Jira.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthScheme {
    /// `email:api_token` as HTTP Basic credentials.
    #[default]
    Basic,
    /// Personal access token as a bearer credential (Data Center 8.14+).
    Bearer,
}

impl FromStr for AuthScheme {
    type Err = std::convert::Infallible;

    /// Anything other than `bearer` selects Basic.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("bearer") {
            Ok(AuthScheme::Bearer)
        } else {
            Ok(AuthScheme::Basic)
        }
    }
}

/// Connection settings for a Jira instance.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub base_url: String,
    pub email: String,
    pub api_token: String,
    pub auth: AuthScheme,
    pub flavor: ApiFlavor,
}

/// Typed client for the subset of the Jira REST API the tools need.
#[derive(Clone)]
pub struct JiraClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
    flavor: ApiFlavor,
}

impl JiraClient {
    /// Build a client. The base URL must be an absolute http(s) URL.
    pub fn new(config: JiraConfig) -> JiraResult<Self> {
        let parsed = url::Url::parse(&config.base_url)
            .map_err(|e| JiraError::InvalidConfig(format!("base URL {}: {e}", config.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(JiraError::InvalidConfig(format!(
                "base URL must be http or https, got {}",
                parsed.scheme()
            )));
        }

        let auth_header = match config.auth {
            AuthScheme::Basic => {
                let raw = format!("{}:{}", config.email, config.api_token);
                format!(
                    "Basic {}",
                    base64::engine::general_purpose::STANDARD.encode(raw)
                )
            }
            AuthScheme::Bearer => format!("Bearer {}", config.api_token),
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(concat!("jira-rest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header,
            flavor: config.flavor,
        })
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Search issues with a JQL query.
    pub async fn search_issues(&self, jql: &str) -> JiraResult<SearchResult> {
        let raw: RawSearch = self.search_raw(jql).await?;
        let issues: Vec<CleanedIssue> = raw.issues.into_iter().map(clean_issue).collect();
        Ok(SearchResult {
            total: raw.total.unwrap_or(issues.len() as u64),
            issues,
        })
    }

    /// All children of an epic, with their comments.
    pub async fn get_epic_children(&self, epic_key: &str) -> JiraResult<Vec<CleanedIssue>> {
        let jql = format!("parent = \"{}\" ORDER BY created ASC", escape_jql(epic_key));
        let raw = self.search_raw(&jql).await?;
        Ok(raw.issues.into_iter().map(clean_issue).collect())
    }

    /// A single issue with comments and linked issues.
    pub async fn get_issue_with_comments(&self, issue_id: &str) -> JiraResult<CleanedIssue> {
        let path = format!("/rest/api/3/issue/{}", encode_segment(issue_id));
        let req = self
            .request(Method::GET, &path)
            .query(&[("fields", ISSUE_FIELDS)]);
        let raw: RawIssue = self.send_json(req).await?;
        Ok(clean_issue(raw))
    }

    /// Create an issue. `fields` entries are merged over the generated ones.
    pub async fn create_issue(
        &self,
        project_key: &str,
        issue_type: &str,
        summary: &str,
        description: Option<&str>,
        fields: Option<Map<String, Value>>,
    ) -> JiraResult<CreatedIssue> {
        let mut all_fields = Map::new();
        all_fields.insert("project".into(), json!({ "key": project_key }));
        all_fields.insert("summary".into(), Value::String(summary.to_string()));
        all_fields.insert("issuetype".into(), json!({ "name": issue_type }));
        if let Some(text) = description {
            all_fields.insert("description".into(), self.flavor.rich_text(text));
        }
        if let Some(extra) = fields {
            all_fields.extend(extra);
        }

        let req = self
            .request(Method::POST, "/rest/api/3/issue")
            .json(&json!({ "fields": all_fields }));
        self.send_json(req).await
    }

    /// Update fields on an existing issue.
    pub async fn update_issue(&self, issue_key: &str, fields: Map<String, Value>) -> JiraResult<()> {
        let path = format!("/rest/api/3/issue/{}", encode_segment(issue_key));
        let req = self
            .request(Method::PUT, &path)
            .json(&json!({ "fields": fields }));
        self.send_empty(req).await
    }

    /// Transitions available from the issue's current status.
    pub async fn get_transitions(&self, issue_key: &str) -> JiraResult<Vec<Transition>> {
        let path = format!("/rest/api/3/issue/{}/transitions", encode_segment(issue_key));
        let raw: RawTransitions = self.send_json(self.request(Method::GET, &path)).await?;
        Ok(raw
            .transitions
            .into_iter()
            .map(|t| Transition {
                id: t.id,
                name: t.name,
                to: t.to.map(|s| StatusRef {
                    id: s.id,
                    name: s.name,
                }),
            })
            .collect())
    }

    /// Perform a transition, optionally adding a comment in the same call.
    pub async fn transition_issue(
        &self,
        issue_key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> JiraResult<()> {
        let path = format!("/rest/api/3/issue/{}/transitions", encode_segment(issue_key));
        let mut payload = json!({ "transition": { "id": transition_id } });
        if let Some(text) = comment {
            payload["update"] = json!({
                "comment": [{ "add": { "body": self.flavor.rich_text(text) } }]
            });
        }
        self.send_empty(self.request(Method::POST, &path).json(&payload))
            .await
    }

    /// Upload a file as an attachment.
    pub async fn add_attachment(
        &self,
        issue_key: &str,
        content: Vec<u8>,
        filename: &str,
    ) -> JiraResult<Attachment> {
        let path = format!("/rest/api/3/issue/{}/attachments", encode_segment(issue_key));
        let part = reqwest::multipart::Part::bytes(content).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let req = self
            .request(Method::POST, &path)
            .header("X-Atlassian-Token", "no-check")
            .multipart(form);

        let uploaded: Vec<RawAttachment> = self.send_json(req).await?;
        let first = uploaded
            .into_iter()
            .next()
            .ok_or_else(|| JiraError::Decode("attachment upload returned no items".into()))?;
        Ok(Attachment {
            id: first.id,
            filename: first.filename,
            size: first.size,
            mime_type: first.mime_type,
        })
    }

    /// Add a plain-text comment.
    pub async fn add_comment(&self, issue_key: &str, body: &str) -> JiraResult<CleanedComment> {
        let path = format!("/rest/api/3/issue/{}/comment", encode_segment(issue_key));
        let req = self
            .request(Method::POST, &path)
            .json(&json!({ "body": self.flavor.rich_text(body) }));
        let raw: RawComment = self.send_json(req).await?;
        Ok(clean_comment(raw))
    }

    async fn search_raw(&self, jql: &str) -> JiraResult<RawSearch> {
        let max = SEARCH_MAX_RESULTS.to_string();
        let req = self.request(Method::GET, "/rest/api/3/search").query(&[
            ("jql", jql),
            ("maxResults", max.as_str()),
            ("fields", ISSUE_FIELDS),
        ]);
        self.send_json(req).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, self.flavor.rewrite_path(path));
        tracing::debug!(%method, %url, "jira request");
        self.http
            .request(method, url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> JiraResult<T> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| JiraError::Decode(e.to_string()))
    }

    async fn send_empty(&self, req: RequestBuilder) -> JiraResult<()> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }
        Ok(())
    }
}

fn api_error(status: StatusCode, body: &str) -> JiraError {
    let message = serde_json::from_str::<RawErrorBody>(body)
        .ok()
        .and_then(|b| b.summarize())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed.chars().take(500).collect()
            }
        });
    tracing::warn!(status = status.as_u16(), %message, "jira request failed");
    JiraError::Api {
        status: status.as_u16(),
        message,
    }
}

fn clean_issue(raw: RawIssue) -> CleanedIssue {
    let f = raw.fields;

    let related_issues = f
        .issuelinks
        .into_iter()
        .filter_map(|link| {
            let (other, relationship) = match (link.outward_issue, link.inward_issue) {
                (Some(out), _) => (out, link.link_type.outward.unwrap_or(link.link_type.name)),
                (None, Some(inw)) => (inw, link.link_type.inward.unwrap_or(link.link_type.name)),
                (None, None) => return None,
            };
            Some(RelatedIssue {
                key: other.key,
                summary: other.fields.and_then(|s| s.summary),
                relationship,
            })
        })
        .collect();

    CleanedIssue {
        id: raw.id,
        key: raw.key,
        summary: f.summary.unwrap_or_default(),
        status: f.status.map(|s| s.name),
        issue_type: f.issuetype.map(|s| s.name),
        priority: f.priority.map(|s| s.name),
        assignee: f.assignee.and_then(|u| u.label()),
        reporter: f.reporter.and_then(|u| u.label()),
        created: f.created,
        updated: f.updated,
        labels: f.labels,
        description: f
            .description
            .as_ref()
            .map(adf::to_plain_text)
            .unwrap_or_default(),
        parent: f.parent.map(|p| IssueRef {
            key: p.key,
            summary: p.fields.and_then(|s| s.summary),
        }),
        comments: f
            .comment
            .unwrap_or_default()
            .comments
            .into_iter()
            .map(clean_comment)
            .collect(),
        related_issues,
    }
}

fn clean_comment(raw: RawComment) -> CleanedComment {
    CleanedComment {
        id: raw.id,
        author: raw.author.and_then(|u| u.label()),
        body: raw.body.as_ref().map(adf::to_plain_text).unwrap_or_default(),
        created: raw.created,
        updated: raw.updated,
    }
}

/// Percent-encode a single path segment (issue keys, ids).
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn escape_jql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(auth: AuthScheme) -> JiraConfig {
        JiraConfig {
            base_url: "https://example.atlassian.net/".into(),
            email: "dev@example.com".into(),
            api_token: "secret".into(),
            auth,
            flavor: ApiFlavor::Cloud,
        }
    }

    #[test]
    fn test_basic_header() {
        let client = JiraClient::new(config(AuthScheme::Basic)).unwrap();
        let expected = base64::engine::general_purpose::STANDARD.encode("dev@example.com:secret");
        assert_eq!(client.auth_header, format!("Basic {expected}"));
        assert_eq!(client.base_url(), "https://example.atlassian.net");
    }

    #[test]
    fn test_bearer_header() {
        let client = JiraClient::new(config(AuthScheme::Bearer)).unwrap();
        assert_eq!(client.auth_header, "Bearer secret");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut cfg = config(AuthScheme::Basic);
        cfg.base_url = "not a url".into();
        assert!(matches!(JiraClient::new(cfg), Err(JiraError::InvalidConfig(_))));

        let mut cfg = config(AuthScheme::Basic);
        cfg.base_url = "ftp://example.com".into();
        assert!(matches!(JiraClient::new(cfg), Err(JiraError::InvalidConfig(_))));
    }

    #[test]
    fn test_auth_scheme_parse() {
        assert_eq!("bearer".parse::<AuthScheme>().unwrap(), AuthScheme::Bearer);
        assert_eq!("basic".parse::<AuthScheme>().unwrap(), AuthScheme::Basic);
        assert_eq!("".parse::<AuthScheme>().unwrap(), AuthScheme::Basic);
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("ABC-123"), "ABC-123");
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
    }

    #[test]
    fn test_api_error_prefers_jira_messages() {
        let err = api_error(
            StatusCode::BAD_REQUEST,
            r#"{"errorMessages":["Issue does not exist"],"errors":{"summary":"required"}}"#,
        );
        match err {
            JiraError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Issue does not exist; summary: required");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = api_error(StatusCode::NOT_FOUND, "");
        assert_eq!(err.to_string(), "Jira API error (404): Not Found");
    }
}
