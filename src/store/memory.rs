//! In-memory connection store

use async_trait::async_trait;
use dashmap::DashMap;

use super::{ConnectionRecord, ConnectionStore, StoreError};

/// Connection records held in a `DashMap`.
///
/// Never unavailable. `scan` collects keys shard by shard, so writers are
/// never blocked for the whole scan and concurrent inserts/removals cannot
/// invalidate it.
#[derive(Default)]
pub struct MemoryConnectionStore {
    records: DashMap<String, ConnectionRecord>,
}

impl MemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionStore for MemoryConnectionStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
        self.records.insert(record.connection_id.clone(), record);
        Ok(())
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        Ok(self.records.get(connection_id).map(|r| r.value().clone()))
    }

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError> {
        self.records.remove(connection_id);
        Ok(())
    }

    async fn scan(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.iter().map(|r| r.key().clone()).collect())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}
