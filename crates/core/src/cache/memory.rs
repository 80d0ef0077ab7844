//! In-memory cache store.
//!
//! Used by tests and by harnesses that do not need persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::key::RequestKey;
use super::store::{CacheStore, StoredResponse};
use crate::Error;

type Table = HashMap<String, StoredResponse>;

/// Cache store backed by a `BTreeMap` of hash maps behind a tokio RwLock.
///
/// An optional quota bounds the total body bytes across all caches; writes
/// that would exceed it fail with `QUOTA_EXCEEDED` and change nothing.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    caches: Arc<RwLock<BTreeMap<String, Table>>>,
    quota: Option<usize>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(max_bytes: usize) -> Self {
        Self { quota: Some(max_bytes), ..Self::default() }
    }

    /// Total body bytes after replacing `cache`'s entries for `writes`.
    fn usage_after(caches: &BTreeMap<String, Table>, cache: &str, writes: &[(String, usize)]) -> usize {
        let current: usize = caches.values().flat_map(HashMap::values).map(|v| v.body.len()).sum();
        let table = caches.get(cache);
        let mut seen = HashMap::new();
        for (hash, len) in writes {
            seen.insert(hash.as_str(), *len);
        }
        seen.iter().fold(current, |total, (hash, len)| {
            let replaced = table.and_then(|t| t.get(*hash)).map_or(0, |v| v.body.len());
            total - replaced + len
        })
    }

    fn check_quota(&self, caches: &BTreeMap<String, Table>, cache: &str, writes: &[(String, usize)]) -> Result<(), Error> {
        let Some(quota) = self.quota else {
            return Ok(());
        };
        let needed = Self::usage_after(caches, cache, writes);
        if needed > quota {
            return Err(Error::QuotaExceeded(format!("{needed} bytes exceeds quota of {quota}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn create_generation(&self, cache: &str) -> Result<(), Error> {
        self.caches.write().await.entry(cache.to_string()).or_default();
        Ok(())
    }

    async fn get(&self, cache: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let caches = self.caches.read().await;
        Ok(caches.get(cache).and_then(|table| table.get(&key.hash())).cloned())
    }

    async fn put(&self, cache: &str, key: &RequestKey, value: StoredResponse) -> Result<(), Error> {
        let hash = key.hash();
        let mut caches = self.caches.write().await;
        self.check_quota(&caches, cache, &[(hash.clone(), value.body.len())])?;
        caches.entry(cache.to_string()).or_default().insert(hash, value);
        Ok(())
    }

    async fn put_all(&self, cache: &str, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error> {
        // Single write guard: readers see either none or all of the batch.
        let mut caches = self.caches.write().await;
        let sizes: Vec<(String, usize)> = entries.iter().map(|(k, v)| (k.hash(), v.body.len())).collect();
        self.check_quota(&caches, cache, &sizes)?;
        let table = caches.entry(cache.to_string()).or_default();
        for (key, value) in entries {
            table.insert(key.hash(), value);
        }
        Ok(())
    }

    async fn delete_generation(&self, cache: &str) -> Result<bool, Error> {
        Ok(self.caches.write().await.remove(cache).is_some())
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        Ok(self.caches.read().await.keys().cloned().collect())
    }

    async fn entry_count(&self, cache: &str) -> Result<usize, Error> {
        Ok(self.caches.read().await.get(cache).map_or(0, HashMap::len))
    }
}
