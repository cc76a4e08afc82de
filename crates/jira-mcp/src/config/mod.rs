//! Command-line and environment configuration.
//!
//! Every setting can come from a flag or its environment variable; the flag
//! wins when both are present.

use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use jira_rest::{ApiFlavor, AuthScheme, JiraConfig};

use crate::auth::{AuthMode, OAuthSettings};
use crate::transport::http::HttpOptions;
use crate::types::{McpError, McpResult};

/// Connection settings for the Jira instance.
#[derive(Debug, Clone, Args)]
pub struct JiraArgs {
    /// Jira base URL, e.g. https://your-domain.atlassian.net.
    #[arg(long = "jira-base-url", env = "JIRA_BASE_URL")]
    pub base_url: Option<String>,

    /// Account email used for Basic auth.
    #[arg(long = "jira-email", env = "JIRA_USER_EMAIL")]
    pub email: Option<String>,

    /// API token (Cloud) or personal access token (Server/Data Center).
    #[arg(long = "jira-api-token", env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// `basic` or `bearer`.
    #[arg(long = "jira-auth-type", env = "JIRA_AUTH_TYPE", default_value = "basic")]
    pub auth_type: String,

    /// `cloud` or `server`.
    #[arg(long = "jira-type", env = "JIRA_TYPE", default_value = "cloud")]
    pub jira_type: String,
}

impl JiraArgs {
    pub fn resolve(&self) -> McpResult<JiraConfig> {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        let (Some(base_url), Some(email), Some(api_token)) = (
            non_empty(&self.base_url),
            non_empty(&self.email),
            non_empty(&self.api_token),
        ) else {
            return Err(McpError::Config(
                "JIRA_API_TOKEN, JIRA_USER_EMAIL and JIRA_BASE_URL environment variables are required"
                    .to_string(),
            ));
        };

        Ok(JiraConfig {
            base_url,
            email,
            api_token,
            auth: self.auth_type.parse::<AuthScheme>().unwrap_or_default(),
            flavor: self.jira_type.parse::<ApiFlavor>().unwrap_or_default(),
        })
    }
}

/// OAuth resource-server settings.
#[derive(Debug, Clone, Args)]
pub struct OAuthArgs {
    /// Validate bearer tokens as OAuth access tokens.
    #[arg(
        long = "oauth-enabled",
        env = "MCP_OAUTH_ENABLED",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub enabled: bool,

    /// Authorization server advertised in the resource metadata.
    #[arg(long = "oauth-issuer", env = "MCP_OAUTH_ISSUER")]
    pub issuer: Option<String>,

    /// RFC 7662 introspection endpoint. Without it any bearer token passes.
    #[arg(long = "oauth-introspection-url", env = "MCP_OAUTH_INTROSPECTION_URL")]
    pub introspection_url: Option<String>,

    #[arg(long = "oauth-client-id", env = "MCP_OAUTH_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(
        long = "oauth-client-secret",
        env = "MCP_OAUTH_CLIENT_SECRET",
        hide_env_values = true
    )]
    pub client_secret: Option<String>,

    /// Scope the introspected token must carry.
    #[arg(long = "oauth-required-scope", env = "MCP_OAUTH_REQUIRED_SCOPE")]
    pub required_scope: Option<String>,

    #[arg(long = "oauth-docs-url", env = "MCP_OAUTH_DOCS_URL")]
    pub docs_url: Option<String>,
}

/// HTTP listener and transport behaviour.
#[derive(Debug, Clone, Args)]
pub struct HttpArgs {
    #[arg(long, env = "MCP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "MCP_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Static bearer token required on /mcp. Ignored when OAuth is enabled.
    #[arg(long, env = "MCP_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Track sessions with the mcp-session-id header.
    #[arg(
        long,
        env = "MCP_ENABLE_SESSIONS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub enable_sessions: bool,

    /// Answer with plain JSON bodies instead of event streams.
    #[arg(
        long,
        env = "MCP_JSON_ONLY",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub json_only: bool,

    /// Close sessions idle for this many seconds. 0 keeps them until DELETE.
    #[arg(long, env = "MCP_SESSION_IDLE_TIMEOUT", default_value_t = 0)]
    pub session_idle_timeout: u64,

    /// Public origin used in OAuth metadata and challenges.
    /// Defaults to http://<Host header>.
    #[arg(long, env = "MCP_PUBLIC_URL")]
    pub public_url: Option<String>,

    #[command(flatten)]
    pub oauth: OAuthArgs,
}

impl HttpArgs {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// OAuth wins over the static token; neither means no auth.
    pub fn auth_mode(&self) -> AuthMode {
        if self.oauth.enabled {
            return AuthMode::OAuth(OAuthSettings {
                issuer: self.oauth.issuer.clone(),
                introspection_url: self.oauth.introspection_url.clone(),
                client_id: self.oauth.client_id.clone(),
                client_secret: self.oauth.client_secret.clone(),
                required_scope: self.oauth.required_scope.clone(),
                docs_url: self.oauth.docs_url.clone(),
            });
        }
        match self.auth_token.as_deref() {
            Some(token) if !token.is_empty() => AuthMode::StaticToken(token.to_string()),
            _ => AuthMode::Disabled,
        }
    }

    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            enable_sessions: self.enable_sessions,
            json_only: self.json_only,
            public_url: self.public_url.clone(),
            session_idle_timeout: (self.session_idle_timeout > 0)
                .then(|| Duration::from_secs(self.session_idle_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        jira: JiraArgs,
        #[command(flatten)]
        http: HttpArgs,
    }

    #[test]
    fn test_flags_resolve() {
        let cli = TestCli::try_parse_from([
            "jira-mcp",
            "--jira-base-url",
            "https://acme.atlassian.net",
            "--jira-email",
            "dev@acme.io",
            "--jira-api-token",
            "tok",
            "--jira-type",
            "server",
            "--port",
            "8080",
            "--enable-sessions",
            "false",
            "--auth-token",
            "s3cret",
            "--session-idle-timeout",
            "600",
        ])
        .unwrap();

        let config = cli.jira.resolve().unwrap();
        assert_eq!(config.flavor, ApiFlavor::Server);
        assert_eq!(config.auth, AuthScheme::Basic);
        assert_eq!(cli.http.port, 8080);
        let options = cli.http.http_options();
        assert!(!options.enable_sessions);
        assert_eq!(options.session_idle_timeout, Some(Duration::from_secs(600)));
        assert!(matches!(cli.http.auth_mode(), AuthMode::StaticToken(t) if t == "s3cret"));
    }

    #[test]
    fn test_oauth_takes_precedence() {
        let cli = TestCli::try_parse_from([
            "jira-mcp",
            "--auth-token",
            "s3cret",
            "--oauth-enabled",
            "true",
            "--oauth-required-scope",
            "mcp:tools",
        ])
        .unwrap();
        assert_eq!(cli.http.http_options().session_idle_timeout, None);
        match cli.http.auth_mode() {
            AuthMode::OAuth(settings) => {
                assert_eq!(settings.required_scope.as_deref(), Some("mcp:tools"))
            }
            other => panic!("unexpected mode: {other:?}"),
        }
    }

    #[test]
    fn test_missing_credentials_is_an_error() {
        let args = JiraArgs {
            base_url: Some("https://acme.atlassian.net".into()),
            email: None,
            api_token: Some("tok".into()),
            auth_type: "basic".into(),
            jira_type: "cloud".into(),
        };
        assert!(matches!(args.resolve(), Err(McpError::Config(_))));
    }
}
