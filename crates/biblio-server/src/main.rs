//! Main entry point for the Biblio lending server.

use std::sync::Arc;
use std::time::Duration;

use biblio_lending::ReadCache;
use biblio_lock::{LockCoordinator, MemorySharedStore, SharedStore};
use biblio_persistence::{
    ExternalDbPersistService, LendingPersistence, MemoryPersistService, StorageMode,
};
use biblio_server::{
    metrics,
    model::{AppState, Configuration, SharedStoreKind},
    startup,
};
use tracing::{info, warn};

async fn build_persistence(
    configuration: &Configuration,
) -> anyhow::Result<Arc<dyn LendingPersistence>> {
    match configuration.storage_mode() {
        StorageMode::ExternalDb => {
            let db = configuration.database_connection().await?;
            let service = ExternalDbPersistService::new(db);
            if configuration.db_init_schema() {
                service.ensure_schema().await?;
            }
            Ok(Arc::new(service))
        }
        StorageMode::Memory => {
            warn!("Using in-memory storage, data is lost on restart");
            Ok(Arc::new(MemoryPersistService::new()))
        }
    }
}

async fn build_shared_store(configuration: &Configuration) -> anyhow::Result<Arc<dyn SharedStore>> {
    match configuration.shared_store() {
        #[cfg(feature = "redis-backend")]
        SharedStoreKind::Redis => {
            let store = biblio_lock::RedisSharedStore::connect(&configuration.redis_url()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "redis-backend"))]
        SharedStoreKind::Redis => {
            anyhow::bail!("Redis shared store requested but the redis-backend feature is disabled")
        }
        SharedStoreKind::Memory => {
            warn!("Using in-process lock store, locks are not shared between instances");
            Ok(Arc::new(
                MemorySharedStore::new().with_cleanup(Duration::from_secs(60)),
            ))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;

    let _logging_guard = startup::init_logging(&configuration.logging_config())?;
    metrics::init_metrics()?;

    let storage_mode = configuration.storage_mode();
    let shared_store_kind = configuration.shared_store();
    info!(%storage_mode, shared_store = %shared_store_kind, "Starting biblio server");

    let persistence = build_persistence(&configuration).await?;
    let shared_store = build_shared_store(&configuration).await?;

    let locks = LockCoordinator::with_options(shared_store, configuration.lock_options());
    let cache = Arc::new(ReadCache::new(configuration.cache_options()));

    let app_state = AppState::new(configuration.clone(), persistence, locks, cache);

    info!(
        address = %configuration.server_address(),
        port = configuration.server_port(),
        "HTTP server listening"
    );

    startup::main_server(app_state, &configuration)?.await?;

    info!("HTTP server stopped");
    Ok(())
}
