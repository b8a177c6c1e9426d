//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use ws_relay::broadcast::Broadcaster;
use ws_relay::dispatcher::Dispatcher;
use ws_relay::registry::Registry;
use ws_relay::router::InboundRouter;
use ws_relay::store::{ConnectionRecord, ConnectionStore, MemoryConnectionStore, StoreError};
use ws_relay::transport::{Payload, Transport, TransportError};

/// Transport with a fixed outcome per connection id; unknown ids deliver
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: HashMap<String, TransportError>,
    calls: AtomicUsize,
    delivered: Mutex<Vec<(String, String)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, connection_id: &str, error: TransportError) -> Self {
        self.outcomes.insert(connection_id.to_string(), error);
        self
    }

    pub fn gone<'a>(mut self, ids: impl IntoIterator<Item = &'a str>) -> Self {
        for id in ids {
            self.outcomes.insert(id.to_string(), TransportError::Gone);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Ids that received a payload, in delivery order
    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn delivered_payloads(&self) -> Vec<(String, String)> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: Payload,
    ) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.outcomes.get(connection_id) {
            return Err(error.clone());
        }
        self.delivered
            .lock()
            .unwrap()
            .push((connection_id.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Store whose every operation reports the backend unreachable
pub struct UnavailableStore;

#[async_trait]
impl ConnectionStore for UnavailableStore {
    fn backend_name(&self) -> &'static str {
        "unavailable"
    }

    async fn put(&self, _record: ConnectionRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn get(&self, _connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _connection_id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn scan(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Memory store that counts every call made against it
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryConnectionStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionStore for CountingStore {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.put(record).await
    }

    async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(connection_id).await
    }

    async fn delete(&self, connection_id: &str) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(connection_id).await
    }

    async fn scan(&self) -> Result<Vec<String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.scan().await
    }
}

/// Fully wired relay around an explicit store and transport
pub struct Relay {
    pub registry: Registry,
    pub broadcaster: Arc<Broadcaster>,
    pub router: InboundRouter,
}

pub fn relay(store: Arc<dyn ConnectionStore>, transport: Arc<dyn Transport>) -> Relay {
    let registry = Registry::new(store);
    let dispatcher = Arc::new(Dispatcher::new(transport, Duration::from_secs(1)));
    let broadcaster = Arc::new(Broadcaster::new(registry.clone(), dispatcher.clone(), 4));
    let router = InboundRouter::new(
        registry.clone(),
        dispatcher,
        broadcaster.clone(),
        "Hello from the relay".to_string(),
    );
    Relay {
        registry,
        broadcaster,
        router,
    }
}

pub async fn registered_set(registry: &Registry) -> HashSet<String> {
    registry.list_all().await.unwrap().into_iter().collect()
}
