//! Shared server state: configuration, storage, network and the registration.

use std::sync::Arc;

use glassboat_core::{AppConfig, CacheStore, Error};
use glassboat_worker::{Network, Registration, Scope, ServiceWorker};

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn CacheStore>,
    pub network: Arc<dyn Network>,
    pub registration: Registration,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let scope = Scope::new(&config.origin, &config.scope)?;
        let registration = Registration::new(scope, store.clone(), network.clone());
        Ok(Self { config, store, network, registration })
    }

    /// Build a worker for `generation`, or for the configured one.
    pub fn worker(&self, generation: Option<&str>) -> Result<ServiceWorker, Error> {
        let config = match generation {
            Some(tag) => self.config.with_generation(tag),
            None => self.config.clone(),
        };
        ServiceWorker::new(&config, self.store.clone(), self.network.clone())
    }
}
