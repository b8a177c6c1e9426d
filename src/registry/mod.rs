//! Connection registry.
//!
//! A thin, stateless facade over a [`ConnectionStore`]: the store is the only
//! place registered connections live, so any number of registries (one per
//! task, per request, per process) built on the same store agree with each
//! other. Presence means "assumed live", nothing stronger.

use std::sync::Arc;

use crate::metrics::RegistryMetrics;
use crate::store::{ConnectionRecord, ConnectionStore, StoreError};

#[derive(Clone)]
pub struct Registry {
    store: Arc<dyn ConnectionStore>,
}

impl Registry {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    /// Record a connection. Re-registering an id overwrites its record.
    #[tracing::instrument(name = "registry.register", skip(self))]
    pub async fn register(&self, connection_id: &str) -> Result<(), StoreError> {
        self.store.put(ConnectionRecord::new(connection_id)).await?;
        RegistryMetrics::record_registered();
        tracing::info!(connection_id = %connection_id, "Connection registered");
        Ok(())
    }

    /// Forget a connection. Unknown ids are a no-op.
    #[tracing::instrument(name = "registry.unregister", skip(self))]
    pub async fn unregister(&self, connection_id: &str) -> Result<(), StoreError> {
        self.store.delete(connection_id).await?;
        RegistryMetrics::record_unregistered();
        tracing::info!(connection_id = %connection_id, "Connection unregistered");
        Ok(())
    }

    /// Snapshot of every registered id, in no particular order
    pub async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        self.store.scan().await
    }

    pub async fn contains(&self, connection_id: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(connection_id).await?.is_some())
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.store.len().await
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryConnectionStore;

    fn registry() -> Registry {
        Registry::new(Arc::new(MemoryConnectionStore::new()))
    }

    #[tokio::test]
    async fn test_register_twice_keeps_one_record() {
        let registry = registry();
        registry.register("cX").await.unwrap();
        registry.register("cX").await.unwrap();

        assert_eq!(registry.list_all().await.unwrap(), vec!["cX".to_string()]);
        assert_eq!(registry.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unregister_unknown_is_ok() {
        let registry = registry();
        registry.register("c1").await.unwrap();

        registry.unregister("ghost").await.unwrap();
        assert_eq!(registry.list_all().await.unwrap(), vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let registry = registry();
        registry.register("c1").await.unwrap();
        assert!(registry.contains("c1").await.unwrap());
        assert!(registry.list_all().await.unwrap().contains(&"c1".to_string()));

        registry.unregister("c1").await.unwrap();
        assert!(!registry.contains("c1").await.unwrap());
        assert!(registry.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registries_on_same_store_agree() {
        let store: Arc<dyn ConnectionStore> = Arc::new(MemoryConnectionStore::new());
        let a = Registry::new(store.clone());
        let b = Registry::new(store);

        a.register("c1").await.unwrap();
        assert!(b.contains("c1").await.unwrap());

        b.unregister("c1").await.unwrap();
        assert!(!a.contains("c1").await.unwrap());
    }
}
