//! HTTP front end for the event audit service
//!
//! Accepts raw JSON events over HTTP, stores them through
//! [`EventAuditService`] on a [`PersistentBlobStore`], and streams them back
//! by storage id.

pub mod config;
pub mod routes;

pub use config::{Cli, ConfigError, ServerConfig, StorageSection};
pub use routes::{ApiError, router};

use std::sync::Arc;

use audit_storage::{EventAuditService, PersistentBlobStore, StorageError};
use tracing::info;

/// Open the persistent store described by `config` and wrap it in a service
pub async fn open_service(config: &ServerConfig) -> Result<EventAuditService, StorageError> {
    let store = PersistentBlobStore::new(config.blob_store_config()).await?;
    info!(
        data_dir = %config.storage.data_dir.display(),
        max_event_size = config.storage.max_event_size,
        "Event store ready"
    );

    Ok(EventAuditService::new(Arc::new(store))
        .with_max_event_size(config.storage.max_event_size))
}
