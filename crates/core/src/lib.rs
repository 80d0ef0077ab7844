//! Core types and shared functionality for the glassboat offline worker.
//!
//! This crate provides:
//! - Request/response model seen by the worker
//! - Generation-aware cache storage (in-memory and SQLite backends)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheName, CacheStore, Generation, MemoryCacheStore, RequestKey, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Request, Response, ResponseSource};
