//! Scope-level coordination of generations and open pages.
//!
//! A registration owns at most one active worker, one waiting worker and the
//! set of open clients. Lifecycle steps (install, activation, reaping) are
//! serialized; fetches run concurrently against whichever worker is active.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glassboat_core::{CacheStore, Error, Request, Response};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::fetch::{CacheMode, Network, Scope};
use crate::lifecycle::WorkerState;
use crate::router::Route;
use crate::signal::{MessageOutcome, WorkerMessage};
use crate::worker::ServiceWorker;

/// An open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub cache: String,
    pub generation: String,
    pub state: WorkerState,
}

impl WorkerStatus {
    fn of(worker: &ServiceWorker) -> Self {
        Self {
            cache: worker.cache_name().to_string(),
            generation: worker.generation().to_string(),
            state: worker.state(),
        }
    }
}

/// Snapshot of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationStatus {
    pub active: Option<WorkerStatus>,
    pub waiting: Option<WorkerStatus>,
    pub installing: Option<WorkerStatus>,
    pub clients: usize,
    /// Clients still controlled by a generation other than the active one.
    pub stale_clients: usize,
    pub caches: Vec<String>,
}

#[derive(Default)]
struct Inner {
    active: Option<Arc<ServiceWorker>>,
    waiting: Option<Arc<ServiceWorker>>,
    installing: Option<Arc<ServiceWorker>>,
    /// Open clients and the cache that controls each; `None` for uncontrolled pages.
    clients: HashMap<ClientId, Option<String>>,
}

impl Inner {
    /// Clients controlled by a cache other than `cache`.
    fn clients_not_on(&self, cache: &str) -> usize {
        self.clients
            .values()
            .filter(|controller| matches!(controller, Some(name) if name != cache))
            .count()
    }
}

pub struct Registration {
    scope: Scope,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    lifecycle: Mutex<()>,
    inner: Mutex<Inner>,
    next_client: AtomicU64,
}

impl Registration {
    /// Only requests under `scope` are served; everything else is refused.
    pub fn new(scope: Scope, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        Self {
            scope,
            store,
            network,
            lifecycle: Mutex::new(()),
            inner: Mutex::new(Inner::default()),
            next_client: AtomicU64::new(1),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Install `worker` and activate it if nothing holds it back.
    ///
    /// Returns the worker's resulting state: `active`, or `installed` when it
    /// is waiting for older clients to close.
    ///
    /// # Errors
    ///
    /// `INSTALL_FAILED` when pre-caching fails; the active generation keeps
    /// serving. Activation errors leave the previous generation active.
    pub async fn register(&self, worker: ServiceWorker) -> Result<WorkerState, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        let worker = Arc::new(worker);

        {
            let mut inner = self.inner.lock().await;
            if let Some(active) = &inner.active
                && active.cache_name() == worker.cache_name()
            {
                tracing::info!(cache = %active.cache_name(), "generation already active");
                return Ok(active.state());
            }
            inner.installing = Some(worker.clone());
        }

        let installed = worker.install().await;

        let mut inner = self.inner.lock().await;
        inner.installing = None;
        installed?;

        if let Some(previous) = inner.waiting.replace(worker.clone()) {
            tracing::info!(cache = %previous.cache_name(), replaced_by = %worker.cache_name(), "discarding waiting worker");
            previous.discard()?;
        }

        self.try_activate(&mut inner).await?;
        Ok(worker.state())
    }

    /// Activate the waiting worker unless older clients still need the active one.
    async fn try_activate(&self, inner: &mut Inner) -> Result<(), Error> {
        let Some(waiting) = inner.waiting.clone() else {
            return Ok(());
        };

        let cache = waiting.cache_name().to_string();
        let blocking = inner.clients_not_on(&cache);
        if inner.active.is_some() && blocking > 0 && !waiting.skip_waiting_requested() {
            tracing::info!(cache = %cache, clients = blocking, "waiting for older clients to close");
            return Ok(());
        }

        inner.waiting = None;
        if let Some(active) = &inner.active {
            active.stop_caching();
            active.settle().await;
        }

        if let Err(e) = waiting.activate().await {
            if let Some(active) = &inner.active {
                active.resume_caching();
            }
            return Err(e);
        }

        if let Some(previous) = inner.active.replace(waiting.clone()) {
            previous.supersede()?;
        }
        for controller in inner.clients.values_mut() {
            *controller = Some(cache.clone());
        }
        tracing::info!(cache = %cache, clients = inner.clients.len(), "generation activated and claimed clients");
        Ok(())
    }

    /// Open a page; it is controlled by the active generation, if any.
    pub async fn connect_client(&self) -> ClientId {
        let id = ClientId(self.next_client.fetch_add(1, Ordering::SeqCst));
        let mut inner = self.inner.lock().await;
        let controller = inner.active.as_ref().map(|w| w.cache_name().to_string());
        tracing::debug!(client = %id, controller = ?controller, "client connected");
        inner.clients.insert(id, controller);
        id
    }

    /// Close a page. A waiting worker activates once no older client remains.
    ///
    /// # Errors
    ///
    /// `INVALID_INPUT` for an unknown client, or the activation error.
    pub async fn disconnect_client(&self, id: ClientId) -> Result<(), Error> {
        let _lifecycle = self.lifecycle.lock().await;
        let mut inner = self.inner.lock().await;
        if inner.clients.remove(&id).is_none() {
            return Err(Error::InvalidInput(format!("unknown client: {id}")));
        }
        tracing::debug!(client = %id, "client disconnected");
        self.try_activate(&mut inner).await
    }

    async fn active(&self) -> Option<Arc<ServiceWorker>> {
        self.inner.lock().await.active.clone()
    }

    /// Strategy the active worker would pick, or `None` with no active worker.
    pub async fn route(&self, request: &Request) -> Option<Route> {
        self.active().await.map(|worker| worker.route(request))
    }

    /// Serve a page request through the active worker, or straight from the
    /// network when nothing is active.
    ///
    /// # Errors
    ///
    /// `OUT_OF_SCOPE` for a URL outside the registered origin and path; no
    /// request is sent for it.
    pub async fn fetch(&self, request: Request) -> Result<Response, Error> {
        if !self.scope.contains(&request.url) {
            tracing::debug!(url = %request.url, scope = %self.scope.base(), "refusing out-of-scope fetch");
            return Err(Error::OutOfScope(format!("{} is not under {}", request.url, self.scope.base())));
        }

        // Retry once if the worker we picked was superseded mid-request.
        for _ in 0..2 {
            let Some(worker) = self.active().await else {
                return self.network.fetch(&request, CacheMode::Default).await;
            };
            match worker.handle_fetch(&request).await {
                Err(Error::InvalidState { .. }) if worker.state().is_terminal() => continue,
                other => return other,
            }
        }
        Err(Error::InvalidState { expected: WorkerState::Active.to_string(), actual: WorkerState::Superseded.to_string() })
    }

    /// Deliver a page message to the waiting worker (else installing, else active).
    ///
    /// An accepted skip-waiting is applied before this returns; if a deploy
    /// is still installing it activates as soon as the install completes.
    pub async fn post_message(&self, message: WorkerMessage) -> Result<MessageOutcome, Error> {
        let target = {
            let inner = self.inner.lock().await;
            inner.waiting.clone().or_else(|| inner.installing.clone()).or_else(|| inner.active.clone())
        };

        let Some(worker) = target else {
            tracing::debug!("message with no worker registered");
            return Ok(MessageOutcome::Ignored);
        };

        let outcome = worker.handle_message(message);
        if outcome == MessageOutcome::Accepted && worker.state() == WorkerState::Installed {
            let _lifecycle = self.lifecycle.lock().await;
            let mut inner = self.inner.lock().await;
            self.try_activate(&mut inner).await?;
        }
        Ok(outcome)
    }

    pub async fn status(&self) -> Result<RegistrationStatus, Error> {
        let caches = self.store.list_generations().await?;
        let inner = self.inner.lock().await;
        let active_cache = inner.active.as_ref().map(|w| w.cache_name().to_string());
        let stale_clients = match &active_cache {
            Some(cache) => inner.clients_not_on(cache),
            None => 0,
        };

        Ok(RegistrationStatus {
            active: inner.active.as_deref().map(WorkerStatus::of),
            waiting: inner.waiting.as_deref().map(WorkerStatus::of),
            installing: inner.installing.as_deref().map(WorkerStatus::of),
            clients: inner.clients.len(),
            stale_clients,
            caches,
        })
    }

    /// Wait for every background cache write of the current workers.
    pub async fn settle(&self) {
        let workers: Vec<Arc<ServiceWorker>> = {
            let inner = self.inner.lock().await;
            inner.active.iter().chain(inner.waiting.iter()).cloned().collect()
        };
        for worker in workers {
            worker.settle().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::PassReason;
    use crate::testing::{FakeNetwork, ORIGIN, config, url};
    use url::Url;
    use glassboat_core::{AppConfig, Destination, MemoryCacheStore, RequestKey, ResponseSource};

    const SHELL_ASSETS: [&str; 3] = ["/index.html", "/app.js", "/style.css"];

    struct Harness {
        store: Arc<MemoryCacheStore>,
        network: Arc<FakeNetwork>,
        registration: Registration,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryCacheStore::new());
            let network = Arc::new(FakeNetwork::new());
            network.serve("/index.html", 200, "text/html", "<html>v9</html>");
            network.serve("/app.js", 200, "text/javascript", "boot(9)");
            network.serve("/style.css", 200, "text/css", "body{}");
            let scope = Scope::new(ORIGIN, "/").unwrap();
            let registration = Registration::new(scope, store.clone(), network.clone());
            Self { store, network, registration }
        }

        fn worker(&self, cfg: &AppConfig) -> ServiceWorker {
            ServiceWorker::new(cfg, self.store.clone(), self.network.clone()).unwrap()
        }

        async fn deploy(&self, tag: &str) -> Result<WorkerState, Error> {
            self.registration.register(self.worker(&config(tag, &SHELL_ASSETS))).await
        }

        async fn deploy_waiting(&self, tag: &str) -> Result<WorkerState, Error> {
            let mut cfg = config(tag, &SHELL_ASSETS);
            cfg.skip_waiting = false;
            self.registration.register(self.worker(&cfg)).await
        }

        async fn active_cache(&self) -> Option<String> {
            self.registration.status().await.unwrap().active.map(|w| w.cache)
        }
    }

    #[tokio::test]
    async fn test_offline_script_served_from_installed_generation() {
        let h = Harness::new();
        assert_eq!(h.deploy("v9").await.unwrap(), WorkerState::Active);

        h.network.go_offline();
        let response = h.registration.fetch(Request::get(url("/app.js"), Destination::Script)).await.unwrap();

        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"boot(9)");
    }

    #[tokio::test]
    async fn test_range_request_bypasses_full_cached_copy() {
        let h = Harness::new();
        let audio = vec![7u8; 4096];
        h.network.serve("/audio/en.mp3", 200, "audio/mpeg", audio.clone());
        h.deploy("v9").await.unwrap();

        let full = h.registration.fetch(Request::get(url("/audio/en.mp3"), Destination::Audio)).await.unwrap();
        assert_eq!(full.body.len(), 4096);
        h.registration.settle().await;
        let key = RequestKey::new("GET", &url("/audio/en.mp3"), false);
        assert!(h.store.get("islai-v9", &key).await.unwrap().is_some());

        let ranged = Request::get(url("/audio/en.mp3"), Destination::Audio).with_header("Range", "bytes=1000-");
        assert_eq!(h.registration.route(&ranged).await, Some(Route::PassThrough(PassReason::Range)));
        let partial = h.registration.fetch(ranged).await.unwrap();

        assert_eq!(partial.status, 206);
        assert_eq!(partial.source, ResponseSource::Network);
        assert_eq!(partial.body.len(), 3096);
        let last = h.network.calls().pop().unwrap();
        assert_eq!(last.range.as_deref(), Some("bytes=1000-"));
    }

    #[tokio::test]
    async fn test_new_generation_replaces_old() {
        let h = Harness::new();
        h.deploy("v9").await.unwrap();
        h.registration.connect_client().await;

        h.network.serve("/index.html", 200, "text/html", "<html>v10</html>");
        assert_eq!(h.deploy("v10").await.unwrap(), WorkerState::Active);

        let page = h.registration.fetch(Request::get(url("/index.html"), Destination::Document)).await.unwrap();
        assert_eq!(&page.body[..], b"<html>v10</html>");
        assert_eq!(h.store.list_generations().await.unwrap(), vec!["islai-v10"]);

        let status = h.registration.status().await.unwrap();
        assert_eq!(status.stale_clients, 0);
        assert_eq!(status.caches, vec!["islai-v10"]);
    }

    #[tokio::test]
    async fn test_failed_deploy_keeps_serving_previous_generation() {
        let h = Harness::new();
        h.deploy("v9").await.unwrap();

        let broken = h.worker(&config("v10", &["/index.html", "/app.js", "/missing.js"]));
        let err = h.registration.register(broken).await.unwrap_err();
        assert!(matches!(err, Error::InstallFailed { .. }));

        assert_eq!(h.active_cache().await.as_deref(), Some("islai-v9"));
        assert_eq!(h.store.list_generations().await.unwrap(), vec!["islai-v9"]);
        let status = h.registration.status().await.unwrap();
        assert!(status.waiting.is_none());
        assert!(status.installing.is_none());
    }

    #[tokio::test]
    async fn test_waiting_generation_activates_when_old_clients_close() {
        let h = Harness::new();
        h.deploy("v9").await.unwrap();
        let first = h.registration.connect_client().await;
        let second = h.registration.connect_client().await;

        h.network.serve("/app.js", 200, "text/javascript", "boot(10)");
        assert_eq!(h.deploy_waiting("v10").await.unwrap(), WorkerState::Installed);

        let status = h.registration.status().await.unwrap();
        assert_eq!(status.active.map(|w| w.cache).as_deref(), Some("islai-v9"));
        assert_eq!(status.waiting.map(|w| w.state), Some(WorkerState::Installed));
        assert_eq!(status.caches, vec!["islai-v10", "islai-v9"]);

        h.network.go_offline();
        let script = h.registration.fetch(Request::get(url("/app.js"), Destination::Script)).await.unwrap();
        assert_eq!(&script.body[..], b"boot(9)");

        h.registration.disconnect_client(first).await.unwrap();
        assert_eq!(h.active_cache().await.as_deref(), Some("islai-v9"));

        h.registration.disconnect_client(second).await.unwrap();
        assert_eq!(h.active_cache().await.as_deref(), Some("islai-v10"));
        assert_eq!(h.store.list_generations().await.unwrap(), vec!["islai-v10"]);

        let script = h.registration.fetch(Request::get(url("/app.js"), Destination::Script)).await.unwrap();
        assert_eq!(&script.body[..], b"boot(10)");
    }

    #[tokio::test]
    async fn test_skip_waiting_takes_over_and_is_idempotent() {
        let h = Harness::new();
        h.deploy("v9").await.unwrap();
        let client = h.registration.connect_client().await;
        h.deploy_waiting("v10").await.unwrap();

        let outcome = h.registration.post_message(WorkerMessage::SkipWaiting).await.unwrap();
        assert_eq!(outcome, MessageOutcome::Accepted);

        let status = h.registration.status().await.unwrap();
        assert_eq!(status.active.map(|w| w.cache).as_deref(), Some("islai-v10"));
        assert!(status.waiting.is_none());
        assert_eq!(status.stale_clients, 0);

        let again = h.registration.post_message(WorkerMessage::SkipWaiting).await.unwrap();
        assert_eq!(again, MessageOutcome::Ignored);
        assert_eq!(h.active_cache().await.as_deref(), Some("islai-v10"));

        h.registration.disconnect_client(client).await.unwrap();
    }

    #[tokio::test]
    async fn test_newer_waiting_worker_replaces_older_one() {
        let h = Harness::new();
        h.deploy("v9").await.unwrap();
        h.registration.connect_client().await;

        h.deploy_waiting("v10").await.unwrap();
        h.deploy_waiting("v11").await.unwrap();

        let status = h.registration.status().await.unwrap();
        assert_eq!(status.waiting.map(|w| w.cache).as_deref(), Some("islai-v11"));

        h.registration.post_message(WorkerMessage::SkipWaiting).await.unwrap();
        assert_eq!(h.store.list_generations().await.unwrap(), vec!["islai-v11"]);
    }

    #[tokio::test]
    async fn test_redeploying_active_generation_is_noop() {
        let h = Harness::new();
        h.deploy("v9").await.unwrap();
        let calls = h.network.calls().len();

        assert_eq!(h.deploy("v9").await.unwrap(), WorkerState::Active);
        assert_eq!(h.network.calls().len(), calls);
        assert_eq!(h.store.entry_count("islai-v9").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_without_active_worker_requests_go_to_network() {
        let h = Harness::new();
        let response = h.registration.fetch(Request::get(url("/app.js"), Destination::Script)).await.unwrap();

        assert_eq!(response.source, ResponseSource::Network);
        assert!(h.store.list_generations().await.unwrap().is_empty());
        assert_eq!(h.registration.post_message(WorkerMessage::SkipWaiting).await.unwrap(), MessageOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_out_of_scope_fetch_never_reaches_network() {
        let h = Harness::new();
        let metadata =
            || Request::get(Url::parse("http://169.254.169.254/latest/meta-data/").unwrap(), Destination::Document);

        let err = h.registration.fetch(metadata()).await.unwrap_err();
        assert!(matches!(err, Error::OutOfScope(_)));
        assert!(h.network.calls().is_empty());

        h.deploy("v9").await.unwrap();
        let calls = h.network.calls().len();
        let err = h.registration.fetch(metadata()).await.unwrap_err();
        assert!(matches!(err, Error::OutOfScope(_)));

        let other_port = Request::get(Url::parse("http://localhost:9000/app.js").unwrap(), Destination::Script);
        assert!(matches!(h.registration.fetch(other_port).await, Err(Error::OutOfScope(_))));
        assert_eq!(h.network.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_unknown_client_disconnect() {
        let h = Harness::new();
        let err = h.registration.disconnect_client(ClientId::new(42)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
