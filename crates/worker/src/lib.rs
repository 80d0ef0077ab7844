//! The glassboat offline worker.
//!
//! This crate provides:
//! - Manifest pre-caching into generation-versioned caches
//! - Reaping of superseded generations on activation
//! - Request classification and the network-first / cache-first strategies
//! - The per-generation lifecycle and the skip-waiting signal
//! - A scope-level registration coordinating generations and open pages

pub mod fetch;
pub mod install;
pub mod lifecycle;
pub mod manifest;
pub mod reaper;
pub mod registration;
pub mod router;
pub mod signal;
pub mod strategy;
pub mod worker;
pub mod writes;

#[cfg(test)]
mod testing;

pub use fetch::{CacheMode, FetchConfig, HttpNetwork, Network, Scope};
pub use install::InstallReport;
pub use lifecycle::WorkerState;
pub use manifest::AssetManifest;
pub use registration::{ClientId, Registration, RegistrationStatus, WorkerStatus};
pub use router::{PassReason, RequestRouter, Route};
pub use signal::{MessageOutcome, WorkerMessage};
pub use worker::ServiceWorker;
