use crate::config::{Config, StoreBackend};
use crate::store::{AttendanceStore, MemoryAttendanceStore, MySqlAttendanceStore};
use anyhow::{Context, Result};
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::warn;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Picks the attendance store named by the configuration.
pub async fn init_store(config: &Config) -> Result<Arc<dyn AttendanceStore>> {
    match (config.store_backend, config.database_url.as_deref()) {
        (StoreBackend::Mysql, Some(url)) => {
            let pool = init_db(url).await?;
            Ok(Arc::new(MySqlAttendanceStore::new(pool)))
        }
        (StoreBackend::Mysql, None) => anyhow::bail!("DATABASE_URL must be set for the mysql store"),
        (StoreBackend::Memory, _) => {
            warn!("Running in degraded mode: attendance records are kept in memory only");
            Ok(Arc::new(MemoryAttendanceStore::new()))
        }
    }
}
