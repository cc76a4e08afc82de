//! MCP capability negotiation during initialization.

use crate::types::{
    is_supported_protocol_version, ClientCapabilities, Implementation, InitializeParams,
    InitializeResult, McpResult, LATEST_PROTOCOL_VERSION,
};

/// Stored client state after negotiation.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub protocol_version: Option<String>,
    pub initialized: bool,
}

impl NegotiatedCapabilities {
    pub fn negotiate(&mut self, params: InitializeParams) -> McpResult<InitializeResult> {
        let version = if is_supported_protocol_version(&params.protocol_version) {
            params.protocol_version.clone()
        } else {
            tracing::warn!(
                "Client requested protocol version {}, answering with {}",
                params.protocol_version,
                LATEST_PROTOCOL_VERSION
            );
            LATEST_PROTOCOL_VERSION.to_string()
        };

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        self.client = params.capabilities;
        self.client_info = Some(params.client_info);
        self.protocol_version = Some(version.clone());

        Ok(InitializeResult::with_version(&version))
    }

    pub fn mark_initialized(&mut self) {
        self.initialized = true;
        tracing::info!("MCP handshake complete");
    }
}
