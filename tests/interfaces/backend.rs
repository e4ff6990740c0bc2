//! Backend factory for interface tests.
//!
//! Creates the catalog store selected by the `STORAGE_BACKEND` environment
//! variable, so the same scenarios run against every adapter.

use std::env;
use std::sync::Arc;

use rentshelf::interfaces::CatalogStore;
use rentshelf::storage::InMemoryCatalogStore;

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl StorageBackend {
    pub fn from_env() -> Self {
        match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StorageBackend::Sqlite,
            _ => StorageBackend::Memory,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

/// Holds the store for a backend and whatever keeps it alive.
pub struct StorageContext {
    pub store: Arc<dyn CatalogStore>,
    /// Database directory, removed on drop.
    #[allow(dead_code)]
    dir: Option<tempfile::TempDir>,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("store", &"<dyn CatalogStore>")
            .field("dir", &self.dir)
            .finish()
    }
}

impl StorageContext {
    /// In-memory context, usable without a runtime.
    pub fn memory() -> Self {
        StorageContext {
            store: Arc::new(InMemoryCatalogStore::new()),
            dir: None,
        }
    }

    /// Create a storage context for the configured backend.
    pub async fn new(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Memory => Self::memory(),
            StorageBackend::Sqlite => Self::create_sqlite().await,
        }
    }

    #[cfg(feature = "sqlite")]
    async fn create_sqlite() -> Self {
        use rentshelf::storage::{NotificationFeed, SqliteCatalogStore};
        use sqlx::sqlite::SqlitePoolOptions;

        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("catalog.db").display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("Failed to create SQLite pool");

        let store = SqliteCatalogStore::new(pool, NotificationFeed::default());
        store.init().await.expect("Failed to create tables");

        StorageContext {
            store: Arc::new(store),
            dir: Some(dir),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    async fn create_sqlite() -> Self {
        panic!("SQLite feature not enabled. Build with --features sqlite");
    }
}
