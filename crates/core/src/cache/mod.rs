//! Generation-scoped response caches.
//!
//! Every deploy writes into its own named cache (`<app-id>-<generation>`).
//! Two interchangeable backends implement [`CacheStore`]:
//!
//! - [`MemoryCacheStore`] for tests and ephemeral harnesses
//! - [`CacheDb`], SQLite via tokio-rusqlite with WAL mode and migrations

pub mod connection;
pub mod entries;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod name;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::RequestKey;
pub use memory::MemoryCacheStore;
pub use name::{CacheName, Generation};
pub use store::{CacheStore, StoredResponse};
