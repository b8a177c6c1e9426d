//! Durable mapping from connection id to connection record.
//!
//! # Backends
//!
//! - `MemoryConnectionStore`: process-local `DashMap` (default, single instance)
//! - `RedisConnectionStore`: one key per connection under a configurable prefix
//! - `ScopedConnectionStore`: per-instance view over either of the above
//!
//! Use `create_connection_store()` to build the backend named in configuration.

mod memory;
mod redis_store;
mod scoped;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::StoreConfig;
use crate::redis::RedisPool;

pub use memory::MemoryConnectionStore;
pub use redis_store::RedisConnectionStore;
pub use scoped::ScopedConnectionStore;

/// Stored record for one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: String,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionRecord {
    pub fn new(connection_id: impl Into<String>) -> Self {
        Self {
            connection_id: connection_id.into(),
            connected_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached; callers may retry later
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Key-value contract every store backend honours.
///
/// `put` and `delete` are idempotent. `scan` returns a snapshot of ids: it
/// must not fail or skip entries because of concurrent writes, but may still
/// list an id deleted while the scan ran.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError>;

    async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError>;

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError>;

    async fn scan(&self) -> Result<Vec<String>, StoreError>;

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.scan().await?.len())
    }
}

/// Build the configured store backend.
///
/// `"redis"` needs a pool; without one we fall back to memory and warn.
pub fn create_connection_store(
    config: &StoreConfig,
    redis_pool: Option<Arc<RedisPool>>,
) -> Arc<dyn ConnectionStore> {
    match config.backend.as_str() {
        "redis" => {
            if let Some(pool) = redis_pool {
                tracing::info!(
                    backend = "redis",
                    prefix = %config.key_prefix,
                    "Creating Redis connection store"
                );
                Arc::new(RedisConnectionStore::new(
                    pool,
                    config.key_prefix.clone(),
                    config.scan_count,
                ))
            } else {
                tracing::warn!(
                    "Redis connection store requested but no pool provided, falling back to memory"
                );
                Arc::new(MemoryConnectionStore::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory connection store");
            Arc::new(MemoryConnectionStore::new())
        }
    }
}
