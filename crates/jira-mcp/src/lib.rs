//! Jira MCP server. Exposes Jira issues as MCP tools over Streamable HTTP
//! and stdio.

pub mod auth;
pub mod config;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use auth::{AuthGate, AuthMode};
pub use protocol::ProtocolHandler;
pub use session::SessionRegistry;
pub use transport::{HttpOptions, HttpTransport, StdioTransport};
