//! One deployed generation: its manifest, cache and lifecycle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glassboat_core::{AppConfig, CacheName, CacheStore, Error, Generation, Request, Response};
use tokio::sync::watch;
use url::Url;

use crate::fetch::{CacheMode, Network, Scope};
use crate::install::{InstallReport, install};
use crate::lifecycle::WorkerState;
use crate::manifest::AssetManifest;
use crate::reaper::reap;
use crate::router::{PassReason, RequestRouter, Route};
use crate::signal::{MessageOutcome, WorkerMessage};
use crate::strategy::{GenerationCache, cache_first, network_first};
use crate::writes::BackgroundWrites;

/// The offline worker for a single generation.
///
/// Lifecycle methods are driven by a [`crate::registration::Registration`];
/// calling them out of order fails with `INVALID_STATE`.
pub struct ServiceWorker {
    cache_name: CacheName,
    manifest: AssetManifest,
    router: RequestRouter,
    offline_shell: Url,
    cache: GenerationCache,
    network: Arc<dyn Network>,
    state: watch::Sender<WorkerState>,
    skip_waiting: AtomicBool,
}

impl ServiceWorker {
    /// Build a worker for `config.generation`.
    ///
    /// # Errors
    ///
    /// `INVALID_INPUT` for a bad app id or generation tag, `INVALID_URL` or
    /// `OUT_OF_SCOPE` for a manifest entry or offline shell outside the scope.
    pub fn new(config: &AppConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let generation = Generation::new(config.generation.clone())?;
        let cache_name = CacheName::new(config.app_id.clone(), generation)?;
        let scope = Scope::new(&config.origin, &config.scope)?;
        let manifest = AssetManifest::resolve(&scope, &config.manifest)?;
        let offline_shell = scope.resolve(&config.offline_shell)?;
        let router = RequestRouter::new(scope, &config.network_first_paths)?;

        let cache = GenerationCache {
            name: cache_name.to_string(),
            store,
            ignore_search: config.ignore_search,
            writes: BackgroundWrites::new(),
        };

        Ok(Self {
            cache_name,
            manifest,
            router,
            offline_shell,
            cache,
            network,
            state: watch::channel(WorkerState::Parsed).0,
            skip_waiting: AtomicBool::new(config.skip_waiting),
        })
    }

    pub fn cache_name(&self) -> &CacheName {
        &self.cache_name
    }

    pub fn generation(&self) -> &Generation {
        self.cache_name.generation()
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Whether this worker may activate while older clients are still open.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    fn transition(&self, next: WorkerState) -> Result<(), Error> {
        let mut from = None;
        let changed = self.state.send_if_modified(|state| {
            from = Some(*state);
            if state.can_transition_to(next) {
                *state = next;
                true
            } else {
                false
            }
        });

        let from = from.unwrap_or(next);
        if !changed {
            return Err(Error::InvalidState { expected: format!("a state that can become {next}"), actual: from.to_string() });
        }
        tracing::info!(cache = %self.cache_name, %from, to = %next, "worker state changed");
        Ok(())
    }

    fn fail(&self, err: Error) -> Error {
        if let Err(e) = self.transition(WorkerState::Redundant) {
            tracing::warn!(cache = %self.cache_name, error = %e, "could not mark worker redundant");
        }
        err
    }

    /// Pre-cache the manifest. On failure the worker becomes redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Installing)?;

        let report = install(
            self.cache.store.as_ref(),
            self.network.as_ref(),
            &self.manifest,
            &self.cache.name,
            self.cache.ignore_search,
        )
        .await
        .map_err(|e| self.fail(e))?;

        self.transition(WorkerState::Installed)?;
        Ok(report)
    }

    /// Delete superseded generations and start serving. Returns the deleted caches.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(WorkerState::Activating)?;
        let deleted = reap(self.cache.store.as_ref(), &self.cache_name)
            .await
            .map_err(|e| self.fail(e))?;
        self.transition(WorkerState::Active)?;
        Ok(deleted)
    }

    /// A newer generation took over.
    pub fn supersede(&self) -> Result<(), Error> {
        self.transition(WorkerState::Superseded)
    }

    /// Drop a waiting worker that was replaced before it activated.
    pub fn discard(&self) -> Result<(), Error> {
        self.transition(WorkerState::Redundant)
    }

    /// Strategy this worker would use for `request`.
    pub fn route(&self, request: &Request) -> Route {
        self.router.classify(request)
    }

    /// Serve a request intercepted by the active worker.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Error> {
        let state = self.state();
        if !state.can_intercept_fetch() {
            return Err(Error::InvalidState { expected: WorkerState::Active.to_string(), actual: state.to_string() });
        }

        let route = self.route(request);
        tracing::debug!(cache = %self.cache_name, url = %request.url, %route, "routing fetch");

        match route {
            Route::PassThrough(PassReason::OutOfScope) => {
                Err(Error::OutOfScope(format!("{} is not under {}", request.url, self.router.scope().base())))
            }
            Route::PassThrough(_) => self.network.fetch(request, CacheMode::Default).await,
            Route::NetworkFirst => {
                network_first(&self.cache, self.network.as_ref(), request, &self.offline_shell).await
            }
            Route::CacheFirst => cache_first(&self.cache, self.network.as_ref(), request).await,
        }
    }

    /// Apply a page message. Only a worker that has not activated yet can be told to skip waiting.
    pub fn handle_message(&self, message: WorkerMessage) -> MessageOutcome {
        match message {
            WorkerMessage::SkipWaiting => {
                let state = self.state();
                if !state.is_pending() {
                    tracing::debug!(cache = %self.cache_name, %state, "skip-waiting ignored");
                    return MessageOutcome::Ignored;
                }
                self.skip_waiting.store(true, Ordering::SeqCst);
                tracing::info!(cache = %self.cache_name, "skip-waiting requested");
                MessageOutcome::Accepted
            }
        }
    }

    /// Stop caching responses, e.g. while a newer generation reaps this one.
    pub fn stop_caching(&self) {
        self.cache.writes.close();
    }

    /// Undo [`stop_caching`](Self::stop_caching) after a failed takeover.
    pub fn resume_caching(&self) {
        self.cache.writes.reopen();
    }

    /// Wait for this worker's background cache writes.
    pub async fn settle(&self) {
        self.cache.writes.settle().await;
    }
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("cache", &self.cache.name)
            .field("state", &self.state())
            .field("assets", &self.manifest.len())
            .finish()
    }
}
