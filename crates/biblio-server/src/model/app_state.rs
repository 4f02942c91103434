//! Application state shared across handlers

use std::sync::Arc;

use biblio_lending::{CatalogService, LendingService, ReadCache};
use biblio_lock::LockCoordinator;
use biblio_persistence::LendingPersistence;

use super::config::Configuration;

/// Everything a handler needs, built once in `main` and cloned into each worker
#[derive(Clone)]
pub struct AppState {
    pub configuration: Configuration,
    pub persistence: Arc<dyn LendingPersistence>,
    pub locks: LockCoordinator,
    pub cache: Arc<ReadCache>,
    pub lending: LendingService,
    pub catalog: CatalogService,
}

impl AppState {
    /// Wire the services over one persistence backend, lock coordinator and cache
    pub fn new(
        configuration: Configuration,
        persistence: Arc<dyn LendingPersistence>,
        locks: LockCoordinator,
        cache: Arc<ReadCache>,
    ) -> Self {
        let lending = LendingService::new(persistence.clone(), locks.clone(), cache.clone());
        let catalog = CatalogService::new(persistence.clone(), cache.clone());

        Self {
            configuration,
            persistence,
            locks,
            cache,
            lending,
            catalog,
        }
    }
}
