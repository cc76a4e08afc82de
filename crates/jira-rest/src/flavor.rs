//! API dialect policy: Jira Cloud vs. Jira Server / Data Center.

use std::borrow::Cow;
use std::str::FromStr;

use serde_json::Value;

use crate::adf;

const CLOUD_API_PREFIX: &str = "/rest/api/3/";
const SERVER_API_PREFIX: &str = "/rest/api/2/";

/// Which REST dialect the tracker speaks.
///
/// All request logic is shared. The flavor only decides how paths are
/// rewritten and how rich-text fields are encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiFlavor {
    /// Jira Cloud, REST API v3.
    #[default]
    Cloud,
    /// Jira Server / Data Center, REST API v2.
    Server,
}

impl ApiFlavor {
    /// Map a v3 path onto this flavor's API version.
    pub fn rewrite_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        match self {
            ApiFlavor::Cloud => Cow::Borrowed(path),
            ApiFlavor::Server => {
                if path.contains(CLOUD_API_PREFIX) {
                    Cow::Owned(path.replacen(CLOUD_API_PREFIX, SERVER_API_PREFIX, 1))
                } else {
                    Cow::Borrowed(path)
                }
            }
        }
    }

    /// Encode a plain-text rich-text field (description, comment body).
    pub fn rich_text(&self, text: &str) -> Value {
        match self {
            ApiFlavor::Cloud => adf::from_plain_text(text),
            ApiFlavor::Server => Value::String(text.to_string()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFlavor::Cloud => "cloud",
            ApiFlavor::Server => "server",
        }
    }
}

impl FromStr for ApiFlavor {
    type Err = std::convert::Infallible;

    /// Anything other than `server` selects Cloud.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("server") {
            Ok(ApiFlavor::Server)
        } else {
            Ok(ApiFlavor::Cloud)
        }
    }
}

impl std::fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_keeps_path() {
        let path = "/rest/api/3/issue/ABC-1";
        assert_eq!(ApiFlavor::Cloud.rewrite_path(path), path);
    }

    #[test]
    fn test_server_rewrites_version() {
        assert_eq!(
            ApiFlavor::Server.rewrite_path("/rest/api/3/search?jql=x"),
            "/rest/api/2/search?jql=x"
        );
        assert_eq!(
            ApiFlavor::Server.rewrite_path("/rest/agile/1.0/board"),
            "/rest/agile/1.0/board"
        );
    }

    #[test]
    fn test_parse_defaults_to_cloud() {
        assert_eq!("server".parse::<ApiFlavor>().unwrap(), ApiFlavor::Server);
        assert_eq!("SERVER".parse::<ApiFlavor>().unwrap(), ApiFlavor::Server);
        assert_eq!("cloud".parse::<ApiFlavor>().unwrap(), ApiFlavor::Cloud);
        assert_eq!("anything".parse::<ApiFlavor>().unwrap(), ApiFlavor::Cloud);
    }

    #[test]
    fn test_rich_text_encoding() {
        assert_eq!(ApiFlavor::Server.rich_text("hi"), Value::String("hi".into()));
        assert_eq!(ApiFlavor::Cloud.rich_text("hi")["type"], "doc");
    }
}
