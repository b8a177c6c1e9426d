//! Per-instance view over a shared connection store

use std::sync::Arc;

use async_trait::async_trait;

use super::{ConnectionRecord, ConnectionStore, StoreError};

/// Confines one instance to its own slice of a shared store.
///
/// A local transport can only reach sockets this process terminates, so a
/// broadcast must never see ids registered by another instance: it would
/// report them gone and unregister live connections. Ids are stored as
/// `{scope}:{id}` and `scan` only returns this scope's ids, unprefixed.
/// Scopes must not contain `:`, or one scope could read into another.
pub struct ScopedConnectionStore {
    inner: Arc<dyn ConnectionStore>,
    prefix: String,
}

impl ScopedConnectionStore {
    pub fn new(inner: Arc<dyn ConnectionStore>, scope: &str) -> Self {
        Self {
            inner,
            prefix: format!("{}:", scope),
        }
    }

    fn scoped(&self, connection_id: &str) -> String {
        format!("{}{}", self.prefix, connection_id)
    }

    fn unscoped<'a>(&self, stored_id: &'a str) -> Option<&'a str> {
        stored_id.strip_prefix(&self.prefix)
    }
}

#[async_trait]
impl ConnectionStore for ScopedConnectionStore {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
        let record = ConnectionRecord {
            connection_id: self.scoped(&record.connection_id),
            ..record
        };
        self.inner.put(record).await
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        let record = self.inner.get(&self.scoped(connection_id)).await?;
        Ok(record.map(|r| ConnectionRecord {
            connection_id: connection_id.to_string(),
            ..r
        }))
    }

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError> {
        self.inner.delete(&self.scoped(connection_id)).await
    }

    async fn scan(&self) -> Result<Vec<String>, StoreError> {
        let ids = self.inner.scan().await?;
        Ok(ids
            .iter()
            .filter_map(|id| self.unscoped(id))
            .map(str::to_string)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConnectionStore;

    #[tokio::test]
    async fn test_scopes_do_not_see_each_other() {
        let shared: Arc<dyn ConnectionStore> = Arc::new(MemoryConnectionStore::new());
        let a = ScopedConnectionStore::new(shared.clone(), "a");
        let b = ScopedConnectionStore::new(shared.clone(), "b");

        a.put(ConnectionRecord::new("c1")).await.unwrap();
        b.put(ConnectionRecord::new("c1")).await.unwrap();
        b.put(ConnectionRecord::new("c2")).await.unwrap();

        assert_eq!(a.scan().await.unwrap(), vec!["c1".to_string()]);
        let mut b_ids = b.scan().await.unwrap();
        b_ids.sort();
        assert_eq!(b_ids, vec!["c1".to_string(), "c2".to_string()]);

        a.delete("c1").await.unwrap();
        assert!(a.get("c1").await.unwrap().is_none());
        let record = b.get("c1").await.unwrap().unwrap();
        assert_eq!(record.connection_id, "c1");
        assert_eq!(shared.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unscoped_records_are_ignored() {
        let shared: Arc<dyn ConnectionStore> = Arc::new(MemoryConnectionStore::new());
        shared.put(ConnectionRecord::new("legacy")).await.unwrap();

        let a = ScopedConnectionStore::new(shared.clone(), "a");
        a.put(ConnectionRecord::new("c1")).await.unwrap();

        assert_eq!(a.scan().await.unwrap(), vec!["c1".to_string()]);
        assert!(a.get("legacy").await.unwrap().is_none());
    }
}
