//! Streamable HTTP server: routing, CORS, auth and per-session dispatch.

use std::any::Any;
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use jira_rest::JiraClient;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::auth::{AuthDecision, AuthGate, ProtectedResourceMetadata};
use crate::protocol::ProtocolHandler;
use crate::session::{Session, SessionHandle, SessionRegistry};
use crate::types::{error_codes, mcp_error_codes, JsonRpcError, McpError, McpResult, RequestId};

use super::adapter::{AdaptedRequest, AdaptedResponse, DrainedResponse};
use super::framing;
use super::streamable::{StreamableHttpTransport, TransportOptions, SESSION_HEADER};

pub const MCP_PATH: &str = "/mcp";
pub const PROTECTED_RESOURCE_PATH: &str = "/.well-known/oauth-protected-resource";

/// Base64 attachments travel inside request bodies.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const CORS_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, DELETE, OPTIONS"),
    (
        "access-control-allow-headers",
        "Content-Type, Authorization, Mcp-Session-Id, Accept",
    ),
    ("access-control-expose-headers", "Mcp-Session-Id"),
];

/// Transport behaviour switches.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub enable_sessions: bool,
    pub json_only: bool,
    /// External origin; when unset it is derived from the `Host` header.
    pub public_url: Option<String>,
    /// Sessions without a request for this long are closed and evicted.
    /// `None` keeps sessions until DELETE or shutdown.
    pub session_idle_timeout: Option<Duration>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            enable_sessions: true,
            json_only: false,
            public_url: None,
            session_idle_timeout: None,
        }
    }
}

/// Shared server state passed to all handlers via axum State.
pub struct ServerState {
    client: Arc<JiraClient>,
    registry: Arc<SessionRegistry>,
    auth: AuthGate,
    options: HttpOptions,
}

impl ServerState {
    fn origin(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.options.public_url {
            return url.trim_end_matches('/').to_string();
        }
        let host = header_str(headers, header::HOST.as_str()).unwrap_or("localhost");
        format!("http://{host}")
    }

    /// Build and connect a fresh engine. Stateful engines register themselves
    /// once `initialize` mints their id and evict themselves on close.
    async fn open_session(&self) -> McpResult<SessionHandle> {
        let stateful = self.options.enable_sessions;
        let json_only = self.options.json_only;
        let registry = Arc::downgrade(&self.registry);

        let session = Arc::new_cyclic(|me: &Weak<Session>| {
            let options = if stateful {
                registering_options(me.clone(), registry)
            } else {
                TransportOptions::stateless()
            };
            Session::new(StreamableHttpTransport::new(
                options.json_response(json_only),
            ))
        });

        session
            .lock()
            .await
            .connect(ProtocolHandler::new(Arc::clone(&self.client)))?;
        Ok(session)
    }
}

fn registering_options(me: Weak<Session>, registry: Weak<SessionRegistry>) -> TransportOptions {
    let mut options = TransportOptions::stateful();

    let init_registry = registry.clone();
    options.on_session_initialized = Some(Arc::new(move |id: &str| {
        tracing::info!(session_id = id, "Session initialized");
        if let (Some(session), Some(registry)) = (me.upgrade(), init_registry.upgrade()) {
            registry.register(id, session);
        }
    }));
    options.on_session_closed = Some(Arc::new(move |id: &str| {
        tracing::info!(session_id = id, "Session closed");
        if let Some(registry) = registry.upgrade() {
            registry.evict(id);
        }
    }));

    options
}

/// Streamable HTTP transport for remote MCP clients.
pub struct HttpTransport {
    state: Arc<ServerState>,
}

impl HttpTransport {
    pub fn new(client: Arc<JiraClient>, auth: AuthGate, options: HttpOptions) -> Self {
        Self {
            state: Arc::new(ServerState {
                client,
                registry: Arc::new(SessionRegistry::new()),
                auth,
                options,
            }),
        }
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.state.registry)
    }

    pub fn router(&self) -> Router {
        let state = self.state.clone();

        let mcp = any(handle_mcp)
            .layer(middleware::from_fn_with_state(state.clone(), auth_layer))
            .layer(middleware::map_response(with_cors));

        let mut app = Router::new().route(MCP_PATH, mcp);
        if state.auth.oauth().is_some() {
            app = app.route(PROTECTED_RESOURCE_PATH, get(handle_resource_metadata));
        }

        app.fallback(handle_not_found)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CatchPanicLayer::custom(handle_panic))
                    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
            )
            .with_state(state)
    }

    /// Bind `addr` and serve until Ctrl-C.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let listener = TcpListener::bind(addr).await.map_err(McpError::Io)?;
        tracing::info!("HTTP transport listening on {addr}");
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> McpResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let sweeper = self
            .state
            .options
            .session_idle_timeout
            .map(|max_idle| tokio::spawn(sweep_idle_sessions(self.registry(), max_idle)));

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| McpError::Transport(e.to_string()));

        if let Some(task) = sweeper {
            task.abort();
        }
        served?;

        self.state.registry.clear();
        tracing::info!("HTTP transport stopped");
        Ok(())
    }
}

async fn sweep_idle_sessions(registry: Arc<SessionRegistry>, max_idle: Duration) {
    let mut ticker = tokio::time::interval(max_idle.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        registry.evict_idle(max_idle);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Auth middleware. Preflight requests pass through unauthenticated.
async fn auth_layer(State(state): State<Arc<ServerState>>, request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let origin = state.origin(request.headers());
    match state.auth.check(request.headers(), &origin).await {
        AuthDecision::Allowed => next.run(request).await,
        AuthDecision::Rejected(rejection) => {
            tracing::warn!(status = %rejection.status, "Rejected unauthenticated request");
            rejection.into_response()
        }
    }
}

async fn with_cors(mut response: Response) -> Response {
    apply_cors(response.headers_mut());
    response
}

fn apply_cors(headers: &mut HeaderMap) {
    for (name, value) in CORS_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
}

async fn handle_mcp(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    match dispatch(&state, method, &uri, &headers, body).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Error handling MCP request: {e}");
            internal_error()
        }
    }
}

/// Resolve or create the session for this request, then run its engine.
async fn dispatch(
    state: &ServerState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> McpResult<Response> {
    let parsed = if method == Method::POST {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Error handling MCP request: unparseable body: {e}");
                return Ok(internal_error());
            }
        }
    } else {
        None
    };

    let session_id = header_str(headers, SESSION_HEADER);
    let is_init = parsed.as_ref().is_some_and(framing::is_initialize_request);
    let request = AdaptedRequest::new(method, uri, headers);

    if let Some(id) = session_id {
        if let Some(session) = state.registry.resolve(id) {
            session.touch();
            let mut engine = session.lock().await;
            if !engine.is_closed() {
                return drive(&mut engine, &request, parsed).await;
            }
            drop(engine);
            state.registry.evict(id);
            tracing::debug!(session_id = id, "Dropped closed session");
        }
    }

    if state.options.enable_sessions && !is_init {
        return Ok(jsonrpc_error(
            StatusCode::BAD_REQUEST,
            mcp_error_codes::SERVER_ERROR,
            "Bad Request: No valid session ID provided",
        ));
    }

    let session = state.open_session().await?;
    let mut engine = session.lock().await;
    drive(&mut engine, &request, parsed).await
}

async fn drive(
    engine: &mut StreamableHttpTransport,
    request: &AdaptedRequest,
    body: Option<Value>,
) -> McpResult<Response> {
    let mut response = AdaptedResponse::new();
    engine.handle_request(request, &mut response, body).await?;
    Ok(render(response.drain()))
}

/// Turn the engine's recorded output into an HTTP response. Event streams are
/// sent chunk by chunk in write order, everything else as one body.
fn render(drained: DrainedResponse) -> Response {
    let status = StatusCode::from_u16(drained.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let streaming = drained.is_event_stream();

    let mut headers = HeaderMap::new();
    for (name, value) in &drained.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }

    let body = if streaming {
        let chunks = drained.chunks.into_iter().map(Ok::<_, Infallible>);
        Body::from_stream(futures::stream::iter(chunks))
    } else {
        Body::from(drained.chunks.concat())
    };

    (status, headers, body).into_response()
}

async fn handle_resource_metadata(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Response {
    let Some(settings) = state.auth.oauth() else {
        return handle_not_found().await;
    };

    let origin = state.origin(&headers);
    let document = ProtectedResourceMetadata::build(&origin, settings);
    match serde_json::to_string_pretty(&document) {
        Ok(body) => (
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode resource metadata: {e}");
            internal_error()
        }
    }
}

async fn handle_not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Request handler panicked: {detail}");

    let mut response = internal_error();
    apply_cors(response.headers_mut());
    response
}

fn internal_error() -> Response {
    jsonrpc_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::INTERNAL_ERROR,
        "Internal server error",
    )
}

fn jsonrpc_error(status: StatusCode, code: i32, message: &str) -> Response {
    let body = serde_json::to_vec(&JsonRpcError::new(RequestId::Null, code, message))
        .unwrap_or_default();
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Extract a header value as a string slice.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
