//! Static-token and OAuth token-introspection checks.

use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::types::{McpError, McpResult};

const INTROSPECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// OAuth resource-server settings.
#[derive(Debug, Clone, Default)]
pub struct OAuthSettings {
    pub issuer: Option<String>,
    pub introspection_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub required_scope: Option<String>,
    pub docs_url: Option<String>,
}

/// How inbound requests are authenticated.
#[derive(Debug, Clone, Default)]
pub enum AuthMode {
    #[default]
    Disabled,
    StaticToken(String),
    OAuth(OAuthSettings),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection {
    pub status: StatusCode,
    pub challenge: String,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed,
    Rejected(AuthRejection),
}

impl AuthRejection {
    fn new(status: StatusCode, challenge: impl Into<String>, message: &'static str) -> Self {
        Self {
            status,
            challenge: challenge.into(),
            message,
        }
    }

    fn invalid_token(message: &'static str) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Bearer error=\"invalid_token\"",
            message,
        )
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.message).into_response();
        if let Ok(value) = HeaderValue::from_str(&self.challenge) {
            response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[derive(Debug, Deserialize)]
struct IntrospectionResponse {
    #[serde(default)]
    active: bool,
    #[serde(default)]
    scope: Option<String>,
}

impl IntrospectionResponse {
    fn has_scope(&self, required: &str) -> bool {
        self.scope
            .as_deref()
            .is_some_and(|scopes| scopes.split_whitespace().any(|s| s == required))
    }
}

#[derive(Debug, thiserror::Error)]
enum IntrospectionError {
    #[error("introspection request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("introspection endpoint returned {0}")]
    Status(StatusCode),
}

/// Decides whether a request may reach the MCP endpoint.
#[derive(Debug, Clone)]
pub struct AuthGate {
    mode: AuthMode,
    http: reqwest::Client,
}

impl AuthGate {
    pub fn new(mode: AuthMode) -> McpResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(INTROSPECTION_TIMEOUT)
            .user_agent(concat!("jira-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| McpError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { mode, http })
    }

    pub fn disabled() -> McpResult<Self> {
        Self::new(AuthMode::Disabled)
    }

    pub fn mode(&self) -> &AuthMode {
        &self.mode
    }

    pub fn oauth(&self) -> Option<&OAuthSettings> {
        match &self.mode {
            AuthMode::OAuth(settings) => Some(settings),
            _ => None,
        }
    }

    /// Check the `Authorization` header. `origin` is the public origin used
    /// as the OAuth challenge realm.
    pub async fn check(&self, headers: &HeaderMap, origin: &str) -> AuthDecision {
        match &self.mode {
            AuthMode::Disabled => AuthDecision::Allowed,
            AuthMode::StaticToken(expected) => match bearer_token(headers) {
                Some(token) if token == expected.as_str() => AuthDecision::Allowed,
                _ => {
                    tracing::warn!("Rejected request with missing or wrong bearer token");
                    AuthDecision::Rejected(AuthRejection::new(
                        StatusCode::UNAUTHORIZED,
                        "Bearer",
                        "Unauthorized",
                    ))
                }
            },
            AuthMode::OAuth(settings) => self.check_oauth(settings, headers, origin).await,
        }
    }

    async fn check_oauth(
        &self,
        settings: &OAuthSettings,
        headers: &HeaderMap,
        origin: &str,
    ) -> AuthDecision {
        let Some(token) = bearer_token(headers) else {
            return AuthDecision::Rejected(AuthRejection::new(
                StatusCode::UNAUTHORIZED,
                format!("Bearer realm=\"{origin}\", scope=\"mcp:*\""),
                "Unauthorized",
            ));
        };

        let Some(url) = settings.introspection_url.as_deref() else {
            return AuthDecision::Allowed;
        };

        let info = match self.introspect(url, token, settings).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("Token introspection failed: {e}");
                return AuthDecision::Rejected(AuthRejection::invalid_token(
                    "Authentication failed",
                ));
            }
        };

        if !info.active {
            return AuthDecision::Rejected(AuthRejection::invalid_token(
                "Invalid or expired token",
            ));
        }

        if let Some(scope) = settings.required_scope.as_deref() {
            if !info.has_scope(scope) {
                return AuthDecision::Rejected(AuthRejection::new(
                    StatusCode::FORBIDDEN,
                    format!("Bearer error=\"insufficient_scope\", scope=\"{scope}\""),
                    "Insufficient scope",
                ));
            }
        }

        AuthDecision::Allowed
    }

    async fn introspect(
        &self,
        url: &str,
        token: &str,
        settings: &OAuthSettings,
    ) -> Result<IntrospectionResponse, IntrospectionError> {
        let mut request = self
            .http
            .post(url)
            .form(&[("token", token), ("token_type_hint", "access_token")]);
        if let (Some(id), Some(secret)) = (&settings.client_id, &settings.client_secret) {
            request = request.basic_auth(id, Some(secret));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(IntrospectionError::Status(response.status()));
        }
        Ok(response.json().await?)
    }
}

/// Token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(auth: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(value) = auth {
            map.insert(header::AUTHORIZATION, value.parse().unwrap());
        }
        map
    }

    fn rejection(decision: AuthDecision) -> AuthRejection {
        match decision {
            AuthDecision::Rejected(r) => r,
            AuthDecision::Allowed => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn test_disabled_allows_everything() {
        let gate = AuthGate::disabled().unwrap();
        assert_eq!(gate.check(&headers(None), "http://x").await, AuthDecision::Allowed);
    }

    #[tokio::test]
    async fn test_static_token() {
        let gate = AuthGate::new(AuthMode::StaticToken("s3cret".into())).unwrap();
        assert_eq!(
            gate.check(&headers(Some("Bearer s3cret")), "http://x").await,
            AuthDecision::Allowed
        );

        let r = rejection(gate.check(&headers(Some("Bearer nope")), "http://x").await);
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert_eq!(r.challenge, "Bearer");

        let r = rejection(gate.check(&headers(Some("Basic s3cret")), "http://x").await);
        assert_eq!(r.message, "Unauthorized");
    }

    #[tokio::test]
    async fn test_oauth_without_introspection_accepts_any_bearer() {
        let gate = AuthGate::new(AuthMode::OAuth(OAuthSettings::default())).unwrap();
        assert_eq!(
            gate.check(&headers(Some("Bearer anything")), "https://mcp.example").await,
            AuthDecision::Allowed
        );

        let r = rejection(gate.check(&headers(None), "https://mcp.example").await);
        assert_eq!(r.challenge, "Bearer realm=\"https://mcp.example\", scope=\"mcp:*\"");
    }

    #[tokio::test]
    async fn test_unreachable_introspection_fails_closed() {
        let gate = AuthGate::new(AuthMode::OAuth(OAuthSettings {
            introspection_url: Some("http://127.0.0.1:9/introspect".into()),
            ..OAuthSettings::default()
        }))
        .unwrap();
        let r = rejection(gate.check(&headers(Some("Bearer t")), "http://x").await);
        assert_eq!(r.status, StatusCode::UNAUTHORIZED);
        assert_eq!(r.challenge, "Bearer error=\"invalid_token\"");
        assert_eq!(r.message, "Authentication failed");
    }

    #[test]
    fn test_scope_matching_is_exact() {
        let info = IntrospectionResponse {
            active: true,
            scope: Some("mcp:read mcp:tools".into()),
        };
        assert!(info.has_scope("mcp:tools"));
        assert!(!info.has_scope("mcp:tool"));
    }
}
