//! Storage implementations.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{Config, STORAGE_MEMORY, STORAGE_SQLITE};
use crate::interfaces::CatalogStore;

pub mod feed;
pub mod memory;
pub mod retrying;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use feed::NotificationFeed;
pub use memory::InMemoryCatalogStore;
pub use retrying::RetryingCatalogStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCatalogStore;

/// Initialize the catalog store based on configuration.
///
/// The selected backend is wrapped in a `RetryingCatalogStore` using the
/// configured retry policy.
pub async fn init_storage(
    config: &Config,
) -> Result<Arc<dyn CatalogStore>, Box<dyn std::error::Error>> {
    let storage = &config.storage;
    let capacity = config.notifications.feed_capacity;

    let backend: Arc<dyn CatalogStore> = match storage.storage_type.as_str() {
        STORAGE_MEMORY => {
            info!("Storage: in-memory");
            Arc::new(InMemoryCatalogStore::with_feed_capacity(capacity))
        }
        #[cfg(feature = "sqlite")]
        STORAGE_SQLITE => {
            info!("Storage: {} at {}", storage.storage_type, storage.path);
            if let Some(parent) = std::path::Path::new(&storage.path).parent() {
                std::fs::create_dir_all(parent)?;
            }

            let pool =
                sqlx::SqlitePool::connect(&format!("sqlite:{}?mode=rwc", storage.path)).await?;

            let store = SqliteCatalogStore::new(pool, NotificationFeed::new(capacity));
            store.init().await?;
            Arc::new(store)
        }
        #[cfg(not(feature = "sqlite"))]
        STORAGE_SQLITE => {
            error!("SQLite storage requested but 'sqlite' feature is not enabled");
            return Err("SQLite feature not enabled".into());
        }
        other => {
            error!("Unknown storage type: {}", other);
            return Err(format!("Unknown storage type: {}", other).into());
        }
    };

    Ok(Arc::new(RetryingCatalogStore::new(backend, config.retry.clone())))
}
