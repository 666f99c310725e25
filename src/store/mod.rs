pub mod backend;
pub mod instrumented;
pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use anyhow::{bail, Result};
use std::sync::Arc;

pub use backend::{ItemStore, Page, StoreError};
pub use instrumented::InstrumentedStore;
pub use memory::MemoryItemStore;

#[cfg(feature = "postgres")]
pub use postgres::PostgresItemStore;

/// Store handle shared by every handler - polymorphic over backends
pub type Store = Arc<dyn ItemStore>;

/// Initialize the item store selected by the database URL scheme
pub async fn init_store(config: &crate::config::DatabaseConfig) -> Result<Store> {
    let url = config.url.as_str();

    let store: Store = if url.starts_with("memory://") {
        tracing::info!("Initializing in-memory item store");
        Arc::new(MemoryItemStore::new())
    } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        init_postgres(config).await?
    } else {
        let scheme = url.split("://").next().unwrap_or(url);
        bail!("Unsupported database URL scheme '{}'", scheme);
    };

    Ok(Arc::new(InstrumentedStore::new(store)))
}

#[cfg(feature = "postgres")]
async fn init_postgres(config: &crate::config::DatabaseConfig) -> Result<Store> {
    tracing::info!("Initializing PostgreSQL item store");
    let pool = postgres::connection::create_pool(config).await?;
    postgres::connection::test_connection(&pool).await?;
    postgres::connection::run_migrations(&pool).await?;
    Ok(Arc::new(PostgresItemStore::new(pool)))
}

#[cfg(not(feature = "postgres"))]
async fn init_postgres(_config: &crate::config::DatabaseConfig) -> Result<Store> {
    bail!("PostgreSQL support is disabled; rebuild with the `postgres` feature")
}
