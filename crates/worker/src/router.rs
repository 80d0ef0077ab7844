//! Request classification.
//!
//! Rules are evaluated in order; the first match wins:
//!
//! 1. Outside the registered scope → pass-through
//! 2. Non-GET → pass-through
//! 3. `Range` header → pass-through (a full cached body cannot answer a range)
//! 4. Documents, scripts, locale dictionaries → network-first
//! 5. Everything else → cache-first

use glassboat_core::{Destination, Error, Request};
use regex::RegexSet;
use serde::Serialize;

use crate::fetch::Scope;

/// Why a request bypasses the cache entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    OutOfScope,
    NonGet,
    Range,
}

/// Fetch strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    PassThrough(PassReason),
    NetworkFirst,
    CacheFirst,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::PassThrough(reason) => write!(f, "pass-through ({reason:?})"),
            Route::NetworkFirst => write!(f, "network-first"),
            Route::CacheFirst => write!(f, "cache-first"),
        }
    }
}

/// Pure classifier over method, headers, destination and path.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    scope: Scope,
    network_first_paths: RegexSet,
}

impl RequestRouter {
    /// `patterns` are extra path regexes routed network-first (locale dictionaries by default).
    pub fn new(scope: Scope, patterns: &[String]) -> Result<Self, Error> {
        let network_first_paths = RegexSet::new(patterns)
            .map_err(|e| Error::InvalidInput(format!("invalid network-first pattern: {e}")))?;
        Ok(Self { scope, network_first_paths })
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn classify(&self, request: &Request) -> Route {
        if !self.scope.contains(&request.url) {
            return Route::PassThrough(PassReason::OutOfScope);
        }
        if !request.is_get() {
            return Route::PassThrough(PassReason::NonGet);
        }
        if request.has_range() {
            return Route::PassThrough(PassReason::Range);
        }
        if self.is_fresh_content(request) {
            return Route::NetworkFirst;
        }
        Route::CacheFirst
    }

    /// Markup, logic and text that change between deploys.
    fn is_fresh_content(&self, request: &Request) -> bool {
        match request.destination {
            Destination::Document | Destination::Script | Destination::Json => return true,
            Destination::Other => {}
            _ => return false,
        }

        let path = request.url.path();
        path.ends_with('/')
            || path.ends_with(".html")
            || path.ends_with(".js")
            || path.ends_with(".mjs")
            || self.network_first_paths.is_match(path)
    }
}
