//! worker_deploy tool implementation.
//!
//! Registers a new generation: pre-caches the manifest, then activates it or
//! leaves it waiting for older pages to close.

use glassboat_core::Error;
use glassboat_worker::WorkerState;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::state::AppState;

/// Parameters for the worker_deploy tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerDeployParams {
    /// Generation tag of the new deploy, e.g. "v10". Must differ from every earlier deploy.
    pub generation: String,
}

/// Output from the worker_deploy tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerDeployOutput {
    pub cache: String,
    pub generation: String,
    /// "active", or "installed" while waiting for older clients.
    pub state: String,
}

/// Implementation of the worker_deploy tool.
pub async fn deploy_impl(state: &AppState, params: WorkerDeployParams) -> Result<CallToolResult, McpError> {
    let generation = params.generation.trim();
    if generation.is_empty() {
        return Err(Error::InvalidInput("generation cannot be empty".into()).into());
    }

    let worker = state.worker(Some(generation))?;
    let cache = worker.cache_name().to_string();
    let result: WorkerState = state.registration.register(worker).await?;

    let output = WorkerDeployOutput { cache, generation: generation.to_string(), state: result.to_string() };
    json_result(&output)
}
