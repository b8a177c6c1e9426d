//! Full-registry fanout with self-healing cleanup.
//!
//! A broadcast runs in two phases. First every id in a registry snapshot
//! gets a delivery attempt (concurrently, bounded). Only after all attempts
//! finish are the connections reported gone unregistered, so the store is
//! never mutated while its scan result is still being walked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;

use crate::dispatcher::{DispatchError, Dispatcher};
use crate::metrics::BroadcastMetrics;
use crate::registry::Registry;
use crate::store::StoreError;
use crate::transport::Payload;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub gone: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.gone + self.failed
    }
}

#[derive(Debug, Default)]
pub struct BroadcastStats {
    pub total_broadcasts: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_gone: AtomicU64,
    pub total_failed: AtomicU64,
    pub total_reconciled: AtomicU64,
    pub total_aborted: AtomicU64,
}

impl BroadcastStats {
    pub fn snapshot(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            total_broadcasts: self.total_broadcasts.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_gone: self.total_gone.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            total_reconciled: self.total_reconciled.load(Ordering::Relaxed),
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastStatsSnapshot {
    pub total_broadcasts: u64,
    pub total_delivered: u64,
    pub total_gone: u64,
    pub total_failed: u64,
    pub total_reconciled: u64,
    pub total_aborted: u64,
}

pub struct Broadcaster {
    registry: Registry,
    dispatcher: Arc<Dispatcher>,
    max_concurrent_sends: usize,
    stats: BroadcastStats,
}

impl Broadcaster {
    pub fn new(
        registry: Registry,
        dispatcher: Arc<Dispatcher>,
        max_concurrent_sends: usize,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            max_concurrent_sends: max_concurrent_sends.max(1),
            stats: BroadcastStats::default(),
        }
    }

    pub fn stats(&self) -> BroadcastStatsSnapshot {
        self.stats.snapshot()
    }

    /// Send `payload` to every registered connection.
    ///
    /// Only a failure to read the registry snapshot is returned as an error.
    /// Per-connection outcomes end up in the report; connections registered
    /// after the snapshot are not included.
    #[tracing::instrument(
        name = "broadcaster.broadcast",
        skip(self, payload),
        fields(bytes = payload.len())
    )]
    pub async fn broadcast(&self, payload: Payload) -> Result<BroadcastReport, StoreError> {
        let ids = match self.registry.list_all().await {
            Ok(ids) => ids,
            Err(e) => {
                self.stats.total_aborted.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %e, "Broadcast aborted, registry snapshot failed");
                return Err(e);
            }
        };

        let mut report = BroadcastReport::default();
        let gone = self.fan_out(&ids, &payload, &mut report).await;
        let reconciled = self.reconcile(&gone).await;

        self.stats.total_broadcasts.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .total_gone
            .fetch_add(report.gone as u64, Ordering::Relaxed);
        self.stats
            .total_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
        self.stats
            .total_reconciled
            .fetch_add(reconciled as u64, Ordering::Relaxed);
        BroadcastMetrics::record_broadcast(&report);

        tracing::info!(
            recipients = ids.len(),
            delivered = report.delivered,
            gone = report.gone,
            failed = report.failed,
            reconciled = reconciled,
            "Broadcast completed"
        );

        Ok(report)
    }

    /// Attempt delivery to every id, at most `max_concurrent_sends` in flight.
    /// Returns the ids the transport reported gone.
    async fn fan_out(
        &self,
        ids: &[String],
        payload: &Payload,
        report: &mut BroadcastReport,
    ) -> Vec<String> {
        let mut gone = Vec::new();
        let mut in_flight = FuturesUnordered::new();
        let mut pending = ids.iter();

        loop {
            while in_flight.len() < self.max_concurrent_sends {
                let Some(id) = pending.next() else { break };
                let dispatcher = self.dispatcher.clone();
                let payload = payload.clone();
                in_flight.push(async move {
                    let outcome = dispatcher.send(id, payload).await;
                    (id, outcome)
                });
            }

            let Some((id, outcome)) = in_flight.next().await else {
                break;
            };

            match outcome {
                Ok(_) => report.delivered += 1,
                Err(DispatchError::Gone) => {
                    report.gone += 1;
                    gone.push(id.clone());
                }
                Err(DispatchError::TransientFailure(_)) => report.failed += 1,
            }
        }

        gone
    }

    /// Unregister connections observed gone. A store error here is logged and
    /// left for the next broadcast to retry; the report is unaffected.
    async fn reconcile(&self, gone: &[String]) -> usize {
        let mut reconciled = 0;
        for id in gone {
            match self.registry.unregister(id).await {
                Ok(()) => reconciled += 1,
                Err(e) => {
                    tracing::warn!(
                        connection_id = %id,
                        error = %e,
                        "Failed to unregister gone connection"
                    );
                }
            }
        }
        reconciled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ConnectionRecord, ConnectionStore, MemoryConnectionStore};
    use crate::transport::LocalTransport;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Lists and stores records but cannot delete them
    #[derive(Default)]
    struct UndeletableStore {
        inner: MemoryConnectionStore,
    }

    #[async_trait]
    impl ConnectionStore for UndeletableStore {
        fn backend_name(&self) -> &'static str {
            "undeletable"
        }

        async fn put(&self, record: ConnectionRecord) -> Result<(), StoreError> {
            self.inner.put(record).await
        }

        async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, StoreError> {
            self.inner.get(connection_id).await
        }

        async fn delete(&self, _connection_id: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("delete refused".into()))
        }

        async fn scan(&self) -> Result<Vec<String>, StoreError> {
            self.inner.scan().await
        }
    }

    async fn setup(max_concurrent: usize) -> (Broadcaster, Registry, Arc<LocalTransport>) {
        let registry = Registry::new(Arc::new(MemoryConnectionStore::new()));
        let local = Arc::new(LocalTransport::new(8));
        let dispatcher = Arc::new(Dispatcher::new(local.clone(), Duration::from_secs(1)));
        let broadcaster = Broadcaster::new(registry.clone(), dispatcher, max_concurrent);
        (broadcaster, registry, local)
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let (broadcaster, _, _) = setup(4).await;
        let report = broadcaster.broadcast(Payload::from("hi")).await.unwrap();
        assert_eq!(report, BroadcastReport::default());
        assert_eq!(broadcaster.stats().total_broadcasts, 1);
    }

    #[tokio::test]
    async fn test_gone_connections_are_pruned() {
        let (broadcaster, registry, local) = setup(4).await;
        for id in ["c1", "c2", "c3"] {
            registry.register(id).await.unwrap();
        }
        let mut rx1 = local.attach("c1");
        let mut rx3 = local.attach("c3");

        let report = broadcaster.broadcast(Payload::from("hi")).await.unwrap();
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 2,
                gone: 1,
                failed: 0
            }
        );

        let mut remaining = registry.list_all().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["c1", "c3"]);
        assert_eq!(&*rx1.recv().await.unwrap(), "hi");
        assert_eq!(&*rx3.recv().await.unwrap(), "hi");
        assert_eq!(broadcaster.stats().total_reconciled, 1);
    }

    #[tokio::test]
    async fn test_concurrency_bound_still_reaches_everyone() {
        let (broadcaster, registry, local) = setup(2).await;
        let mut receivers = Vec::new();
        for i in 0..10 {
            let id = format!("c{}", i);
            registry.register(&id).await.unwrap();
            receivers.push(local.attach(&id));
        }

        let report = broadcaster.broadcast(Payload::from("hi")).await.unwrap();
        assert_eq!(report.delivered, 10);
        assert_eq!(report.attempted(), 10);
        for rx in receivers.iter_mut() {
            assert_eq!(&*rx.recv().await.unwrap(), "hi");
        }
    }

    #[tokio::test]
    async fn test_failed_reconcile_keeps_report_and_record() {
        let registry = Registry::new(Arc::new(UndeletableStore::default()));
        let local = Arc::new(LocalTransport::new(8));
        let dispatcher = Arc::new(Dispatcher::new(local.clone(), Duration::from_secs(1)));
        let broadcaster = Broadcaster::new(registry.clone(), dispatcher, 4);

        registry.register("c1").await.unwrap();
        registry.register("c2").await.unwrap();
        let _rx1 = local.attach("c1");

        let report = broadcaster.broadcast(Payload::from("hi")).await.unwrap();
        assert_eq!(
            report,
            BroadcastReport {
                delivered: 1,
                gone: 1,
                failed: 0
            }
        );

        let stats = broadcaster.stats();
        assert_eq!(stats.total_gone, 1);
        assert_eq!(stats.total_reconciled, 0);
        assert_eq!(stats.total_aborted, 0);
        // Left for the next broadcast to retry
        assert!(registry.contains("c2").await.unwrap());
    }
}
