//! MCP tool implementations.
//!
//! This module contains all tools exposed by the glassboat server.

pub mod clients;
pub mod deploy;
pub mod fetch;
pub mod message;
pub mod status;

pub use clients::{ClientCloseParams, close_impl, open_impl};
pub use deploy::{WorkerDeployParams, deploy_impl};
pub use fetch::{WorkerFetchParams, fetch_impl};
pub use message::{WorkerMessageParams, message_impl};
pub use status::status_impl;

use glassboat_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Pretty JSON text result.
fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
