//! Liveness of the shared store and the database

use actix_web::{HttpResponse, get, web};
use biblio_persistence::StorageMode;
use serde::Serialize;
use tracing::warn;

use crate::model::{AppState, response::Result};

pub const SERVICE_NAME: &str = "biblio";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Connected,
    Disconnected,
}

impl<E: std::fmt::Display> From<&std::result::Result<(), E>> for ComponentStatus {
    fn from(value: &std::result::Result<(), E>) -> Self {
        match value {
            Ok(()) => Self::Connected,
            Err(_) => Self::Disconnected,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody {
    service: &'static str,
    storage: StorageMode,
    shared_store: ComponentStatus,
    database: ComponentStatus,
    timestamp: String,
}

#[get("/health")]
pub async fn health(data: web::Data<AppState>) -> HttpResponse {
    let shared_store = data.locks.ping().await;
    if let Err(e) = &shared_store {
        warn!(error = %e, "Shared store health check failed");
    }

    let database = data.persistence.health_check().await;
    if let Err(e) = &database {
        warn!(error = %e, "Database health check failed");
    }

    Result::http_success(HealthBody {
        service: SERVICE_NAME,
        storage: data.persistence.storage_mode(),
        shared_store: ComponentStatus::from(&shared_store),
        database: ComponentStatus::from(&database),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
