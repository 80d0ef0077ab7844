//! The two caching fetch strategies.

use std::sync::Arc;

use glassboat_core::{CacheStore, Error, Request, RequestKey, Response, ResponseSource, StoredResponse};
use url::Url;

use crate::fetch::{CacheMode, Network};
use crate::writes::BackgroundWrites;

/// The current generation's cache, as seen by the strategies.
#[derive(Clone)]
pub struct GenerationCache {
    pub name: String,
    pub store: Arc<dyn CacheStore>,
    pub ignore_search: bool,
    pub writes: BackgroundWrites,
}

impl GenerationCache {
    fn key(&self, request: &Request) -> RequestKey {
        RequestKey::for_request(request, self.ignore_search)
    }

    /// Look up a stored copy. Storage errors count as a miss.
    pub async fn lookup(&self, key: &RequestKey) -> Option<Response> {
        match self.store.get(&self.name, key).await {
            Ok(Some(stored)) => match stored.into_response(ResponseSource::Cache) {
                Ok(response) => Some(response),
                Err(e) => {
                    tracing::warn!(cache = %self.name, key = %key, error = %e, "ignoring undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(cache = %self.name, key = %key, error = %e, "cache read failed");
                None
            }
        }
    }

    /// Spawn a write of `response` under `key`; failures are logged only.
    pub fn store_in_background(&self, key: RequestKey, response: &Response) {
        let value = StoredResponse::from_response(response);
        let store = self.store.clone();
        let cache = self.name.clone();
        let spawned = self.writes.spawn(async move {
            if let Err(e) = store.put(&cache, &key, value).await {
                tracing::warn!(cache = %cache, key = %key, error = %e, "cache write failed");
            }
        });
        if !spawned {
            tracing::debug!(cache = %self.name, "generation retired; response not cached");
        }
    }
}

/// Live network first, then the cached copy, then (for navigations) the offline shell.
pub async fn network_first(
    cache: &GenerationCache, network: &dyn Network, request: &Request, offline_shell: &Url,
) -> Result<Response, Error> {
    let key = cache.key(request);

    let failure = match network.fetch(request, CacheMode::Reload).await {
        Ok(response) if response.is_success() => {
            cache.store_in_background(key, &response);
            return Ok(response);
        }
        Ok(response) => Error::HttpError(format!("status {} for {}", response.status, request.url)),
        Err(e) if e.is_network_failure() => e,
        Err(e) => return Err(e),
    };

    tracing::debug!(url = %request.url, error = %failure, "network-first falling back to cache");

    if let Some(cached) = cache.lookup(&key).await {
        return Ok(cached);
    }

    if request.is_navigation() {
        let shell_key = RequestKey::new("GET", offline_shell, cache.ignore_search);
        if let Some(mut shell) = cache.lookup(&shell_key).await {
            tracing::info!(url = %request.url, "serving offline shell");
            shell.source = ResponseSource::OfflineShell;
            return Ok(shell);
        }
    }

    Err(failure)
}

/// Cached copy if present; otherwise fetch, store a `200` and return it.
pub async fn cache_first(cache: &GenerationCache, network: &dyn Network, request: &Request) -> Result<Response, Error> {
    let key = cache.key(request);

    if let Some(cached) = cache.lookup(&key).await {
        tracing::debug!(url = %request.url, "cache hit");
        return Ok(cached);
    }

    match network.fetch(request, CacheMode::Default).await {
        Ok(response) => {
            if response.status == 200 {
                cache.store_in_background(key, &response);
            }
            Ok(response)
        }
        Err(e) if e.is_network_failure() => Err(Error::CacheMiss(format!("{} ({e})", request.url))),
        Err(e) => Err(e),
    }
}
