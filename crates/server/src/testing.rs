//! Fixed-response network for tool tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use glassboat_core::{AppConfig, Error, MemoryCacheStore, Request, Response, ResponseSource};
use glassboat_worker::{CacheMode, Network};

use crate::state::AppState;

#[derive(Default)]
pub struct StaticNetwork {
    pages: Mutex<HashMap<String, &'static str>>,
    calls: AtomicUsize,
}

impl StaticNetwork {
    pub fn serve(&self, path: &str, body: &'static str) {
        self.pages.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn take_down(&self, path: &str) {
        self.pages.lock().unwrap().remove(path);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request, _cache: CacheMode) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.pages.lock().unwrap().get(request.url.path()).copied();
        let (status, body) = match body {
            Some(body) => (200, body),
            None => (404, "not found"),
        };
        Ok(Response {
            url: request.url.clone(),
            status,
            headers: vec![("content-type".into(), "text/plain".into())],
            body: Bytes::from_static(body.as_bytes()),
            source: ResponseSource::Network,
        })
    }
}

/// State over an in-memory store with `/index.html` and `/app.js` served.
pub fn state() -> (Arc<AppState>, Arc<StaticNetwork>) {
    let network = Arc::new(StaticNetwork::default());
    network.serve("/index.html", "<html>shell</html>");
    network.serve("/app.js", "boot()");

    let config = AppConfig {
        manifest: vec!["./index.html".into(), "./app.js".into()],
        ..AppConfig::default()
    };
    let state = AppState::new(config, Arc::new(MemoryCacheStore::new()), network.clone()).unwrap();
    (Arc::new(state), network)
}

/// Text payload of the first content item.
pub fn text(result: &rmcp::model::CallToolResult) -> String {
    let value = serde_json::to_value(&result.content[0]).unwrap();
    value.get("text").and_then(|v| v.as_str()).unwrap().to_string()
}
