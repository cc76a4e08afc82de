//! End-to-end tool calls: HTTP router → session engine → tool → mocked Jira.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jira_mcp::auth::AuthGate;
use jira_mcp::transport::{HttpOptions, HttpTransport};
use jira_rest::{ApiFlavor, AuthScheme, JiraClient, JiraConfig};

// ─────────────────────── helpers ───────────────────────

fn app_for(server: &MockServer) -> Router {
    let client = JiraClient::new(JiraConfig {
        base_url: server.uri(),
        email: "dev@example.com".into(),
        api_token: "tok".into(),
        auth: AuthScheme::Basic,
        flavor: ApiFlavor::Cloud,
    })
    .unwrap();
    HttpTransport::new(
        Arc::new(client),
        AuthGate::disabled().unwrap(),
        HttpOptions {
            json_only: true,
            ..HttpOptions::default()
        },
    )
    .router()
}

async fn post(app: &Router, body: Value, session: Option<&str>) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream");
    if let Some(id) = session {
        builder = builder.header("mcp-session-id", id);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let session = response
        .headers()
        .get("mcp-session-id")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, session, value)
}

async fn open_session(app: &Router) -> String {
    let (status, session, _) = post(
        app,
        json!({
            "jsonrpc": "2.0", "id": 0, "method": "initialize",
            "params": {
                "protocolVersion": "2025-06-18",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0" }
            }
        }),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    session.unwrap()
}

fn call(id: i64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0", "id": id, "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    })
}

/// The pretty-printed JSON a tool returned as its single text block.
fn tool_json(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

fn issue_body() -> Value {
    json!({
        "id": "10001",
        "key": "PROJ-1",
        "fields": {
            "summary": "Fix login",
            "description": "plain",
            "status": { "name": "To Do" },
            "labels": []
        }
    })
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn get_issue_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/PROJ-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issue_body()))
        .expect(2)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let session = open_session(&app).await;

    let (_, _, first) = post(&app, call(1, "get_issue", json!({"issueId": "PROJ-1"})), Some(&session)).await;
    let (_, _, second) = post(&app, call(2, "get_issue", json!({"issueId": "PROJ-1"})), Some(&session)).await;

    let issue = tool_json(&first);
    assert_eq!(issue["key"], "PROJ-1");
    assert_eq!(issue["summary"], "Fix login");
    assert_eq!(first["result"], second["result"]);
}

#[tokio::test]
async fn transition_reports_comment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/PROJ-1/transitions"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let session = open_session(&app).await;
    let (status, _, response) = post(
        &app,
        call(
            3,
            "transition_issue",
            json!({"issueKey": "PROJ-1", "transitionId": "31", "comment": "shipped"}),
        ),
        Some(&session),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        tool_json(&response)["message"],
        "Issue PROJ-1 transitioned successfully with comment"
    );
}

#[tokio::test]
async fn attachment_decodes_base64() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/PROJ-1/attachments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "900", "filename": "notes.txt", "size": 5, "mimeType": "text/plain" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_for(&server);
    let session = open_session(&app).await;
    let (_, _, response) = post(
        &app,
        call(
            4,
            "add_attachment",
            json!({"issueKey": "PROJ-1", "fileContent": "aGVsbG8=", "filename": "notes.txt"}),
        ),
        Some(&session),
    )
    .await;

    let result = tool_json(&response);
    assert_eq!(result["attachmentId"], "900");
    assert_eq!(
        result["message"],
        "File notes.txt attached successfully to issue PROJ-1"
    );
}

#[tokio::test]
async fn upstream_errors_become_internal_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/NOPE-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errorMessages": ["Issue does not exist or you do not have permission to see it."]
        })))
        .mount(&server)
        .await;

    let app = app_for(&server);
    let session = open_session(&app).await;
    let (status, _, response) =
        post(&app, call(5, "get_issue", json!({"issueId": "NOPE-1"})), Some(&session)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["id"], 5);
    assert_eq!(response["error"]["code"], -32603);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Issue does not exist"));
}

#[tokio::test]
async fn invalid_arguments_never_reach_jira() {
    let server = MockServer::start().await;
    let app = app_for(&server);
    let session = open_session(&app).await;

    let (_, _, response) = post(
        &app,
        call(6, "update_issue", json!({"issueKey": "PROJ-1"})),
        Some(&session),
    )
    .await;
    assert_eq!(response["error"]["code"], -32602);
    assert_eq!(
        response["error"]["message"],
        "issueKey and fields object are required"
    );

    let (_, _, response) = post(&app, call(7, "launch_rocket", json!({})), Some(&session)).await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: launch_rocket");

    assert!(server.received_requests().await.unwrap().is_empty());
}

// ─────────────────────── concurrency ───────────────────────

const JIRA_DELAY: Duration = Duration::from_millis(400);

async fn slow_issue_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/PROJ-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(issue_body())
                .set_delay(JIRA_DELAY),
        )
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn slow_session_does_not_block_other_sessions() {
    let server = slow_issue_server().await;
    let app = app_for(&server);
    let busy = open_session(&app).await;
    let idle = open_session(&app).await;

    let start = Instant::now();
    let (slow, ping) = tokio::join!(
        async {
            let result = post(&app, call(1, "get_issue", json!({ "issueId": "PROJ-1" })), Some(&busy)).await;
            (result, start.elapsed())
        },
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let result = post(&app, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}), Some(&idle)).await;
            (result, start.elapsed())
        }
    );

    let ((slow_status, _, slow_body), slow_done) = slow;
    let ((ping_status, _, ping_body), ping_done) = ping;
    assert_eq!(slow_status, StatusCode::OK);
    assert_eq!(tool_json(&slow_body)["key"], "PROJ-1");
    assert_eq!(ping_status, StatusCode::OK);
    assert_eq!(ping_body["id"], 2);
    assert!(slow_done >= JIRA_DELAY);
    assert!(ping_done < JIRA_DELAY, "ping waited {ping_done:?} behind another session");
}

#[tokio::test]
async fn requests_on_one_session_run_one_at_a_time() {
    let server = slow_issue_server().await;
    let app = app_for(&server);
    let session = open_session(&app).await;

    let start = Instant::now();
    let (first, second) = tokio::join!(
        post(&app, call(1, "get_issue", json!({ "issueId": "PROJ-1" })), Some(&session)),
        post(&app, call(2, "get_issue", json!({ "issueId": "PROJ-1" })), Some(&session)),
    );
    let elapsed = start.elapsed();

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.2["id"], 1);
    assert_eq!(second.2["id"], 2);
    assert!(
        elapsed >= JIRA_DELAY * 2,
        "calls on one session overlapped: {elapsed:?}"
    );
}
