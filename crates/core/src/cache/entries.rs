//! `CacheStore` implementation for the SQLite database.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::key::RequestKey;
use super::store::{CacheStore, StoredResponse};
use crate::Error;

const UPSERT_ENTRY: &str = "INSERT INTO cache_entries (
        cache_name, key_hash, method, url, status, headers_json, body, stored_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(cache_name, key_hash) DO UPDATE SET
        method = excluded.method,
        url = excluded.url,
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const ENSURE_CACHE: &str = "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)";

/// Row fields of one entry, pre-serialized outside the database thread.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status: u16,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl EntryRow {
    fn new(key: &RequestKey, value: StoredResponse) -> Result<Self, Error> {
        Ok(Self {
            key_hash: key.hash(),
            method: key.method().to_string(),
            url: value.url,
            status: value.status,
            headers_json: serde_json::to_string(&value.headers)?,
            body: value.body.to_vec(),
            stored_at: value.stored_at,
        })
    }

    fn insert(&self, conn: &rusqlite::Connection, cache: &str) -> Result<(), Error> {
        conn.execute(
            UPSERT_ENTRY,
            params![
                cache,
                &self.key_hash,
                &self.method,
                &self.url,
                self.status,
                &self.headers_json,
                &self.body,
                &self.stored_at,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn create_generation(&self, cache: &str) -> Result<(), Error> {
        let cache = cache.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(ENSURE_CACHE, params![cache, now])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, cache: &str, key: &RequestKey) -> Result<Option<StoredResponse>, Error> {
        let cache = cache.to_string();
        let key_hash = key.hash();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, u16, String, Vec<u8>, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status, headers_json, body, stored_at
                     FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                )?;
                let result = stmt.query_row(params![cache, key_hash], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                });
                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((url, status, headers_json, body, stored_at)) = row else {
            return Ok(None);
        };
        let headers = serde_json::from_str(&headers_json)?;
        Ok(Some(StoredResponse { url, status, headers, body: Bytes::from(body), stored_at }))
    }

    async fn put(&self, cache: &str, key: &RequestKey, value: StoredResponse) -> Result<(), Error> {
        let cache = cache.to_string();
        let row = EntryRow::new(key, value)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_CACHE, params![&cache, now])?;
                row.insert(&tx, &cache)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, cache: &str, entries: Vec<(RequestKey, StoredResponse)>) -> Result<(), Error> {
        let cache = cache.to_string();
        let rows = entries
            .into_iter()
            .map(|(key, value)| EntryRow::new(&key, value))
            .collect::<Result<Vec<_>, _>>()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_CACHE, params![&cache, now])?;
                for row in &rows {
                    row.insert(&tx, &cache)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete_generation(&self, cache: &str) -> Result<bool, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE cache_name = ?1", params![&cache])?;
                let deleted = tx.execute("DELETE FROM caches WHERE name = ?1", params![&cache])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, cache: &str) -> Result<usize, Error> {
        let cache = cache.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}
