pub mod cached;
pub mod memory;
pub mod postgres;
mod rows;
pub mod sqlite;
pub mod trait_def;

pub use cached::CachedStorage;
pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{LookupMetadata, LookupResult, Storage, StorageError, StorageResult};

use crate::config::{CacheConfig, DatabaseBackend, DatabaseConfig};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Open and initialize the configured backend, wrapped in the read cache
pub async fn connect(database: &DatabaseConfig, cache: &CacheConfig) -> Result<Arc<dyn Storage>> {
    let backend: Arc<dyn Storage> = match database.backend {
        DatabaseBackend::Sqlite => {
            info!("Using SQLite storage: {}", database.url);
            Arc::new(SqliteStorage::new(&database.url, database.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            info!("Using PostgreSQL storage: {}", database.url);
            Arc::new(PostgresStorage::new(&database.url, database.max_connections).await?)
        }
        DatabaseBackend::Memory => {
            info!("Using in-memory storage (data is lost on restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    backend.init().await?;

    Ok(Arc::new(CachedStorage::new(
        backend,
        cache.max_entries,
        cache.ttl_secs,
    )))
}
