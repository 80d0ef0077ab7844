//! Scripted network and config fixtures shared by the worker tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use glassboat_core::{AppConfig, Error, Request, Response, ResponseSource};
use url::Url;

use crate::fetch::{CacheMode, Network};

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> Url {
    Url::parse(&format!("{ORIGIN}{path}")).unwrap()
}

/// Config for generation `tag` pre-caching `manifest`.
pub fn config(tag: &str, manifest: &[&str]) -> AppConfig {
    AppConfig {
        generation: tag.into(),
        origin: ORIGIN.into(),
        manifest: manifest.iter().map(|s| s.to_string()).collect(),
        offline_shell: "/index.html".into(),
        ..AppConfig::default()
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub path: String,
    pub range: Option<String>,
    pub mode: CacheMode,
}

/// In-process origin: fixed responses per path, an online switch and a call log.
///
/// Unknown paths answer 404. `Range: bytes=N-` answers 206 with the tail.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, (u16, String, Bytes)>>,
    offline: AtomicBool,
    calls: Mutex<Vec<Call>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, path: &str, status: u16, content_type: &str, body: impl Into<Bytes>) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, content_type.to_string(), body.into()));
    }

    /// A response value for `path` without registering it.
    pub fn response(&self, path: &str, status: u16, body: impl Into<Bytes>) -> Response {
        Response { url: url(path), status, headers: Vec::new(), body: body.into(), source: ResponseSource::Network }
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    pub fn last_cache_mode(&self, path: &str) -> Option<CacheMode> {
        self.calls().iter().rev().find(|c| c.path == path).map(|c| c.mode)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request, cache: CacheMode) -> Result<Response, Error> {
        let path = request.url.path().to_string();
        let range = request.header("range").map(str::to_string);
        self.calls
            .lock()
            .unwrap()
            .push(Call { path: path.clone(), range: range.clone(), mode: cache });

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }

        let route = self.routes.lock().unwrap().get(&path).cloned();
        let Some((status, content_type, body)) = route else {
            return Ok(Response {
                url: request.url.clone(),
                status: 404,
                headers: Vec::new(),
                body: Bytes::from_static(b"not found"),
                source: ResponseSource::Network,
            });
        };

        let mut headers = vec![("content-type".to_string(), content_type)];
        let (status, body) = match range.as_deref().and_then(|r| r.strip_prefix("bytes=")) {
            Some(bytes) => {
                let start: usize = bytes.trim_end_matches('-').parse().unwrap_or(0).min(body.len());
                headers.push((
                    "content-range".to_string(),
                    format!("bytes {}-{}/{}", start, body.len().saturating_sub(1), body.len()),
                ));
                (206, body.slice(start..))
            }
            None => (status, body),
        };

        Ok(Response { url: request.url.clone(), status, headers, body, source: ResponseSource::Network })
    }
}
