//! The storage interface the worker writes generations into.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use url::Url;

use super::key::RequestKey;
use crate::Error;
use crate::http::{Response, ResponseSource};

/// A response as persisted in a cache generation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

impl StoredResponse {
    /// Snapshot a live response for storage.
    pub fn from_response(response: &Response) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            stored_at: Utc::now().to_rfc3339(),
        }
    }

    /// Rehydrate into a page-facing response tagged with where it came from.
    pub fn into_response(self, source: ResponseSource) -> Result<Response, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))?;
        Ok(Response { url, status: self.status, headers: self.headers, body: self.body, source })
    }
}

/// Named, generation-scoped key → response tables.
///
/// Cache names are plain strings because the store is shared with caches
/// that do not follow the `<app-id>-<generation>` scheme.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create an empty cache if it does not exist yet.
    async fn create_generation(&self, cache: &str) -> Result<(), Error>;

    async fn get(&self, cache: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error>;

    /// Insert or overwrite one entry, creating the cache if needed. Last writer wins.
    async fn put(&self, cache: &str, key: &RequestKey, value: StoredResponse) -> Result<(), Error>;

    /// Write every entry or none of them.
    async fn put_all(&self, cache: &str, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error>;

    /// Delete a cache and all of its entries. Returns false if it did not exist.
    async fn delete_generation(&self, cache: &str) -> Result<bool, Error>;

    /// All cache names in the store, sorted.
    async fn list_generations(&self) -> Result<Vec<String>, Error>;

    async fn entry_count(&self, cache: &str) -> Result<usize, Error>;

    /// True when the cache exists and holds an entry for every key.
    async fn contains_all(&self, cache: &str, keys: &[RequestKey]) -> Result<bool, Error> {
        if !self.list_generations().await?.iter().any(|name| name == cache) {
            return Ok(false);
        }
        for key in keys {
            if self.get(cache, key).await?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
