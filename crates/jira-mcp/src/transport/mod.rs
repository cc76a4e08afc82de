//! Transport layer for MCP communication.

pub mod adapter;
pub mod framing;
pub mod http;
pub mod stdio;
pub mod streamable;

pub use adapter::{AdaptedRequest, AdaptedResponse, DrainedResponse, ServerResponse};
pub use http::{HttpOptions, HttpTransport};
pub use stdio::StdioTransport;
pub use streamable::{StreamableHttpTransport, TransportOptions};
