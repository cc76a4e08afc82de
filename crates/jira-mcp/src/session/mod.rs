//! Session tracking for the HTTP transport.

pub mod registry;

pub use registry::{Session, SessionHandle, SessionRegistry};
