//! worker_message tool implementation.
//!
//! Posts a page message (only `SKIP_WAITING` is understood) to the registration.

use glassboat_core::Error;
use glassboat_worker::WorkerMessage;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// `SKIP_WAITING` or `{"type":"SKIP_WAITING"}`.
    pub message: String,
}

/// Output from the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageOutput {
    /// "accepted" or "ignored".
    pub outcome: String,
    /// Generation serving requests after the message was applied.
    pub active: Option<String>,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(state: &AppState, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    if params.message.trim().is_empty() {
        return Err(Error::InvalidInput("message cannot be empty".into()).into());
    }

    let message: WorkerMessage = params.message.parse()?;
    let outcome = state.registration.post_message(message).await?;
    let status = state.registration.status().await?;

    let output = WorkerMessageOutput { outcome: outcome.to_string(), active: status.active.map(|w| w.generation) };
    json_result(&output)
}
