//! Streamable HTTP transport engine.
//!
//! One engine serves one MCP session (or one request when sessions are
//! disabled). It validates headers and session identity, feeds decoded
//! messages to the bound [`ProtocolHandler`], and writes either a JSON body
//! or a server-sent event stream into a [`ServerResponse`].

use std::sync::Arc;

use axum::http::Method;
use bytes::Bytes;
use serde_json::Value;

use crate::protocol::ProtocolHandler;
use crate::types::{
    is_supported_protocol_version, JsonRpcMessage, McpError, McpResult, RequestId,
    SUPPORTED_PROTOCOL_VERSIONS,
};

use super::adapter::{AdaptedRequest, ServerResponse};
use super::framing;

pub const SESSION_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

pub type SessionIdGenerator = Arc<dyn Fn() -> String + Send + Sync>;
pub type SessionCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Construction options for [`StreamableHttpTransport`].
#[derive(Clone, Default)]
pub struct TransportOptions {
    /// Present means stateful: the engine mints an id on `initialize` and
    /// requires it on every later request.
    pub session_id_generator: Option<SessionIdGenerator>,
    /// Answer requests with a JSON body instead of an event stream.
    pub enable_json_response: bool,
    pub on_session_initialized: Option<SessionCallback>,
    pub on_session_closed: Option<SessionCallback>,
}

impl TransportOptions {
    pub fn stateful() -> Self {
        Self {
            session_id_generator: Some(Arc::new(|| uuid::Uuid::new_v4().to_string())),
            ..Self::default()
        }
    }

    pub fn stateless() -> Self {
        Self::default()
    }

    pub fn json_response(mut self, enabled: bool) -> Self {
        self.enable_json_response = enabled;
        self
    }
}

impl std::fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportOptions")
            .field("stateful", &self.session_id_generator.is_some())
            .field("enable_json_response", &self.enable_json_response)
            .finish()
    }
}

pub struct StreamableHttpTransport {
    options: TransportOptions,
    handler: Option<ProtocolHandler>,
    session_id: Option<String>,
    initialized: bool,
    closed: bool,
}

impl StreamableHttpTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self {
            options,
            handler: None,
            session_id: None,
            initialized: false,
            closed: false,
        }
    }

    /// Bind the protocol handler. Must happen before the first request.
    pub fn connect(&mut self, handler: ProtocolHandler) -> McpResult<()> {
        if self.handler.is_some() {
            return Err(McpError::Transport(
                "transport is already connected".to_string(),
            ));
        }
        self.handler = Some(handler);
        Ok(())
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn handler(&self) -> Option<&ProtocolHandler> {
        self.handler.as_ref()
    }

    /// Handle one HTTP request. Protocol-level rejections are written into
    /// `res`; only internal failures come back as `Err`.
    pub async fn handle_request(
        &mut self,
        req: &AdaptedRequest,
        res: &mut dyn ServerResponse,
        body: Option<Value>,
    ) -> McpResult<()> {
        if self.handler.is_none() {
            return Err(McpError::Transport("transport is not connected".to_string()));
        }
        if self.closed {
            return Err(McpError::Transport("transport is closed".to_string()));
        }

        match *req.method() {
            Method::POST => self.handle_post(req, res, body).await,
            Method::GET => {
                self.handle_get(req, res);
                Ok(())
            }
            Method::DELETE => {
                self.handle_delete(req, res);
                Ok(())
            }
            _ => {
                write_error(
                    res,
                    405,
                    &[("allow", "GET, POST, DELETE")],
                    &McpError::ServerError("Method not allowed.".to_string()),
                );
                Ok(())
            }
        }
    }

    /// Close the transport. The close callback fires once, with the id.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let (Some(id), Some(callback)) = (
            self.session_id.as_deref(),
            self.options.on_session_closed.as_ref(),
        ) {
            callback(id);
        }
    }

    async fn handle_post(
        &mut self,
        req: &AdaptedRequest,
        res: &mut dyn ServerResponse,
        body: Option<Value>,
    ) -> McpResult<()> {
        let accept = req.header("accept").unwrap_or_default();
        if !accept.contains("application/json") || !accept.contains("text/event-stream") {
            write_error(
                res,
                406,
                &[],
                &McpError::ServerError(
                    "Not Acceptable: Client must accept both application/json and text/event-stream"
                        .to_string(),
                ),
            );
            return Ok(());
        }

        let content_type = req.header("content-type").unwrap_or_default();
        if !content_type.contains("application/json") {
            write_error(
                res,
                415,
                &[],
                &McpError::ServerError(
                    "Unsupported Media Type: Content-Type must be application/json".to_string(),
                ),
            );
            return Ok(());
        }

        let Some(body) = body else {
            write_error(
                res,
                400,
                &[],
                &McpError::ParseError("Invalid JSON".to_string()),
            );
            return Ok(());
        };
        let is_batch = body.is_array();
        let messages = match framing::parse_batch(body) {
            Ok(messages) => messages,
            Err(e) => {
                write_error(res, 400, &[], &e);
                return Ok(());
            }
        };

        if messages.iter().any(JsonRpcMessage::is_initialize_request) {
            if self.initialized && self.session_id.is_some() {
                write_error(
                    res,
                    400,
                    &[],
                    &McpError::InvalidRequest("Server already initialized".to_string()),
                );
                return Ok(());
            }
            if messages.len() > 1 {
                write_error(
                    res,
                    400,
                    &[],
                    &McpError::InvalidRequest(
                        "Only one initialization request is allowed".to_string(),
                    ),
                );
                return Ok(());
            }

            self.session_id = self.options.session_id_generator.as_ref().map(|generate| generate());
            self.initialized = true;

            if let (Some(id), Some(callback)) = (
                self.session_id.as_deref(),
                self.options.on_session_initialized.as_ref(),
            ) {
                callback(id);
            }
        } else if !self.validate_session(req, res) || !validate_protocol_version(req, res) {
            return Ok(());
        }

        let Some(handler) = self.handler.clone() else {
            return Err(McpError::Transport("transport is not connected".to_string()));
        };

        if !messages.iter().any(JsonRpcMessage::is_request) {
            for msg in messages {
                handler.handle_message(msg).await;
            }
            res.write_head(202, &[]);
            res.end(None);
            return Ok(());
        }

        let session_id = self.session_id.clone();
        let mut head: Vec<(&str, &str)> = Vec::new();
        if let Some(id) = session_id.as_deref() {
            head.push((SESSION_HEADER, id));
        }

        if self.options.enable_json_response {
            let mut responses = Vec::with_capacity(messages.len());
            for msg in messages {
                if let Some(response) = handler.handle_message(msg).await {
                    responses.push(response);
                }
            }
            let payload = if !is_batch && responses.len() == 1 {
                responses.remove(0)
            } else {
                Value::Array(responses)
            };
            let bytes = serde_json::to_vec(&payload)?;

            head.push(("content-type", "application/json"));
            res.write_head(200, &head);
            res.end(Some(Bytes::from(bytes)));
        } else {
            head.push(("content-type", "text/event-stream"));
            head.push(("cache-control", "no-cache"));
            head.push(("connection", "keep-alive"));
            res.write_head(200, &head);

            for msg in messages {
                if let Some(response) = handler.handle_message(msg).await {
                    res.write(framing::frame_event(&response)?);
                }
            }
            res.end(None);
        }

        Ok(())
    }

    fn handle_get(&self, req: &AdaptedRequest, res: &mut dyn ServerResponse) {
        let accept = req.header("accept").unwrap_or_default();
        if !accept.contains("text/event-stream") {
            write_error(
                res,
                406,
                &[],
                &McpError::ServerError(
                    "Not Acceptable: Client must accept text/event-stream".to_string(),
                ),
            );
            return;
        }
        if !self.validate_session(req, res) || !validate_protocol_version(req, res) {
            return;
        }
        write_error(
            res,
            405,
            &[("allow", "POST, DELETE")],
            &McpError::ServerError(
                "Method not allowed: server-initiated event streams are not supported".to_string(),
            ),
        );
    }

    fn handle_delete(&mut self, req: &AdaptedRequest, res: &mut dyn ServerResponse) {
        if !self.validate_session(req, res) || !validate_protocol_version(req, res) {
            return;
        }
        self.close();
        res.write_head(200, &[]);
        res.end(None);
    }

    /// Writes the rejection and returns `false` when the request does not
    /// belong to this engine's session. Stateless engines accept everything.
    fn validate_session(&self, req: &AdaptedRequest, res: &mut dyn ServerResponse) -> bool {
        if self.options.session_id_generator.is_none() {
            return true;
        }
        if !self.initialized {
            write_error(
                res,
                400,
                &[],
                &McpError::ServerError("Bad Request: Server not initialized".to_string()),
            );
            return false;
        }
        match req.header(SESSION_HEADER) {
            None => {
                write_error(
                    res,
                    400,
                    &[],
                    &McpError::ServerError(
                        "Bad Request: Mcp-Session-Id header is required".to_string(),
                    ),
                );
                false
            }
            Some(id) if Some(id) != self.session_id.as_deref() => {
                write_error(res, 404, &[], &McpError::SessionNotFound);
                false
            }
            Some(_) => true,
        }
    }
}

fn validate_protocol_version(req: &AdaptedRequest, res: &mut dyn ServerResponse) -> bool {
    match req.header(PROTOCOL_VERSION_HEADER) {
        Some(version) if !is_supported_protocol_version(version) => {
            write_error(
                res,
                400,
                &[],
                &McpError::ServerError(format!(
                    "Bad Request: Unsupported protocol version (supported versions: {})",
                    SUPPORTED_PROTOCOL_VERSIONS.join(", ")
                )),
            );
            false
        }
        _ => true,
    }
}

/// Write a JSON-RPC error envelope with a null id.
fn write_error(
    res: &mut dyn ServerResponse,
    status: u16,
    extra_headers: &[(&str, &str)],
    error: &McpError,
) {
    tracing::debug!(status, "Rejected request: {error}");
    let envelope = error.to_json_rpc_error(RequestId::Null);
    let body = serde_json::to_vec(&envelope).unwrap_or_default();

    let mut head = vec![("content-type", "application/json")];
    head.extend_from_slice(extra_headers);
    res.write_head(status, &head);
    res.end(Some(Bytes::from(body)));
}
