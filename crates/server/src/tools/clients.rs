//! client_open / client_close tool implementations.
//!
//! Simulate pages opening and closing. A waiting generation activates once
//! the last page controlled by an older generation closes.

use glassboat_worker::ClientId;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    /// Id returned by client_open.
    pub client_id: u64,
}

/// Output from the client tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientOutput {
    pub client_id: u64,
    /// Generation serving requests after the call.
    pub active: Option<String>,
}

async fn output(state: &AppState, client: ClientId) -> Result<CallToolResult, McpError> {
    let status = state.registration.status().await?;
    json_result(&ClientOutput { client_id: client.get(), active: status.active.map(|w| w.generation) })
}

/// Implementation of the client_open tool.
pub async fn open_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let client = state.registration.connect_client().await;
    output(state, client).await
}

/// Implementation of the client_close tool.
pub async fn close_impl(state: &AppState, params: ClientCloseParams) -> Result<CallToolResult, McpError> {
    let client = ClientId::new(params.client_id);
    state.registration.disconnect_client(client).await?;
    output(state, client).await
}
