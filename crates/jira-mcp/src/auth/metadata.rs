//! OAuth 2.0 protected-resource metadata document.

use serde::Serialize;

use super::gate::OAuthSettings;

pub const SCOPES_SUPPORTED: &[&str] = &["mcp:tools", "mcp:read", "mcp:write"];
pub const RESOURCE_NAME: &str = "JIRA MCP Server";

#[derive(Debug, Clone, Serialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub scopes_supported: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
    pub resource_documentation: String,
    pub resource_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_servers: Option<Vec<String>>,
}

impl ProtectedResourceMetadata {
    pub fn build(origin: &str, settings: &OAuthSettings) -> Self {
        Self {
            resource: format!("{origin}/mcp"),
            scopes_supported: SCOPES_SUPPORTED.iter().map(|s| s.to_string()).collect(),
            bearer_methods_supported: vec!["header".to_string()],
            resource_documentation: settings
                .docs_url
                .clone()
                .unwrap_or_else(|| format!("{origin}/docs")),
            resource_name: RESOURCE_NAME.to_string(),
            authorization_servers: settings.issuer.clone().map(|issuer| vec![issuer]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_derive_from_origin() {
        let doc = ProtectedResourceMetadata::build("https://mcp.example", &OAuthSettings::default());
        assert_eq!(doc.resource, "https://mcp.example/mcp");
        assert_eq!(doc.resource_documentation, "https://mcp.example/docs");
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("authorization_servers").is_none());
    }

    #[test]
    fn test_issuer_and_docs_override() {
        let settings = OAuthSettings {
            issuer: Some("https://auth.example".into()),
            docs_url: Some("https://docs.example/mcp".into()),
            ..OAuthSettings::default()
        };
        let doc = ProtectedResourceMetadata::build("http://localhost:3000", &settings);
        assert_eq!(doc.authorization_servers, Some(vec!["https://auth.example".to_string()]));
        assert_eq!(doc.resource_documentation, "https://docs.example/mcp");
    }
}
