pub mod memory;
pub mod sql;

use crate::core::config::DatabaseConfig;
use crate::core::store::Store;
use anyhow::{Context, Result};
use memory::MemoryStore;
use sql::SqlStore;
use std::sync::Arc;

/// Opens the configured database, or an empty in-memory store for dry runs.
pub async fn open(config: &DatabaseConfig, dry_run: bool) -> Result<Arc<dyn Store>> {
    if dry_run {
        tracing::info!("Dry run: records are kept in memory only");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = SqlStore::connect(&config.url, config.max_connections)
        .await
        .context("Failed to connect to the database")?;
    Ok(Arc::new(store))
}
