//! Bearer-token authentication for the HTTP transport.

pub mod gate;
pub mod metadata;

pub use gate::{AuthDecision, AuthGate, AuthMode, AuthRejection, OAuthSettings};
pub use metadata::ProtectedResourceMetadata;
