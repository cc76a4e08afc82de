//! Typed REST client for Jira Cloud and Jira Server / Data Center.

pub mod adf;
pub mod client;
pub mod flavor;
pub mod types;

pub use client::{AuthScheme, JiraClient, JiraConfig};
pub use flavor::ApiFlavor;
pub use types::*;
