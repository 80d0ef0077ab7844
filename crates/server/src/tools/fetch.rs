//! worker_fetch tool implementation.
//!
//! Sends one page request through the registration, the way a controlled
//! page's fetch would be intercepted.

use std::collections::BTreeMap;

use glassboat_core::{Destination, Error, Request};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::json_result;
use crate::state::AppState;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: document, script, style, image, font, audio, json or other.
    #[serde(default)]
    pub destination: Option<String>,

    /// Extra request headers, e.g. `{"Range": "bytes=1000-"}`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Include the body as text when it is valid UTF-8 (default: true).
    #[serde(default = "default_true")]
    pub include_body: bool,
}

fn default_method() -> String {
    "GET".into()
}

fn default_true() -> bool {
    true
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    pub url: String,
    pub status: u16,
    /// Where the body came from: network, cache or offline_shell.
    pub source: String,
    /// Strategy chosen by the active worker; absent with no active worker.
    pub route: Option<String>,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub body: Option<String>,
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(state: &AppState, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let origin = Url::parse(&state.config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let url = origin
        .join(params.url.trim())
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    if !state.registration.scope().contains(&url) {
        return Err(Error::OutOfScope(format!("{url} is not under {}", state.registration.scope().base())).into());
    }

    let destination = match params.destination.as_deref() {
        Some(raw) => raw.parse::<Destination>()?,
        None => Destination::default(),
    };

    let request = Request {
        method: params.method.to_uppercase(),
        url,
        destination,
        headers: params.headers.into_iter().collect(),
    };

    let route = state.registration.route(&request).await.map(|r| r.to_string());
    let response = state.registration.fetch(request).await?;

    let body = params
        .include_body
        .then(|| std::str::from_utf8(&response.body).ok().map(str::to_string))
        .flatten();

    let output = WorkerFetchOutput {
        url: response.url.to_string(),
        status: response.status,
        source: response.source.to_string(),
        route,
        content_type: response.content_type().map(str::to_string),
        body_len: response.body.len(),
        body,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{state, text};

    fn params(url: &str) -> WorkerFetchParams {
        WorkerFetchParams {
            url: url.into(),
            method: default_method(),
            destination: Some("script".into()),
            headers: BTreeMap::new(),
            include_body: true,
        }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (state, _) = state();
        assert!(fetch_impl(&state, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_unknown_destination() {
        let (state, _) = state();
        let bad = WorkerFetchParams { destination: Some("hologram".into()), ..params("/app.js") };
        assert!(fetch_impl(&state, bad).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_without_worker_goes_to_network() {
        let (state, _) = state();
        let result = fetch_impl(&state, params("/app.js")).await.unwrap();
        let output: WorkerFetchOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.source, "network");
        assert_eq!(output.route, None);
        assert_eq!(output.body.as_deref(), Some("boot()"));
    }

    #[tokio::test]
    async fn test_fetch_refuses_foreign_url() {
        let (state, network) = state();
        let metadata = WorkerFetchParams {
            destination: Some("document".into()),
            ..params("http://169.254.169.254/latest/meta-data/")
        };

        let err = fetch_impl(&state, metadata.clone()).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
        assert_eq!(network.calls(), 0);

        state.registration.register(state.worker(None).unwrap()).await.unwrap();
        let calls = network.calls();
        let err = fetch_impl(&state, metadata).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_cache() {
        let (state, network) = state();
        state.registration.register(state.worker(None).unwrap()).await.unwrap();
        network.take_down("/app.js");

        let result = fetch_impl(&state, params("/app.js")).await.unwrap();
        let output: WorkerFetchOutput = serde_json::from_str(&text(&result)).unwrap();

        assert_eq!(output.status, 200);
        assert_eq!(output.source, "cache");
        assert_eq!(output.route.as_deref(), Some("network-first"));
        assert_eq!(output.body.as_deref(), Some("boot()"));
    }
}
