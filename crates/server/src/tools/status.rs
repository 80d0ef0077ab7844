//! worker_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};

use super::json_result;
use crate::state::AppState;

/// Active and waiting generations, open clients and the caches on disk.
pub async fn status_impl(state: &AppState) -> Result<CallToolResult, McpError> {
    let status = state.registration.status().await?;
    json_result(&status)
}
