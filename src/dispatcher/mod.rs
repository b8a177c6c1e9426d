//! Single-connection delivery.
//!
//! The dispatcher sends one payload to one connection and classifies the
//! outcome. It never touches the registry: deciding what to do about a gone
//! connection is the broadcaster's job.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::metrics::DeliveryMetrics;
use crate::transport::{Payload, Transport, TransportError};

/// The transport accepted the payload for this connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The connection no longer exists on the transport side
    #[error("Connection is gone")]
    Gone,

    /// Anything else; says nothing about whether the connection is alive
    #[error("Transient delivery failure: {0}")]
    TransientFailure(String),
}

impl From<TransportError> for DispatchError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Gone => DispatchError::Gone,
            other => DispatchError::TransientFailure(other.to_string()),
        }
    }
}

#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub total_sent: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_gone: AtomicU64,
    pub total_failed: AtomicU64,
}

impl DispatcherStats {
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            total_sent: self.total_sent.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_gone: self.total_gone.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub total_sent: u64,
    pub total_delivered: u64,
    pub total_gone: u64,
    pub total_failed: u64,
}

pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    send_timeout: Duration,
    stats: DispatcherStats,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, send_timeout: Duration) -> Self {
        Self {
            transport,
            send_timeout,
            stats: DispatcherStats::default(),
        }
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Send `payload` to one connection.
    ///
    /// A send that outlives `send_timeout` is a transient failure.
    #[tracing::instrument(
        name = "dispatcher.send",
        skip(self, payload),
        fields(bytes = payload.len())
    )]
    pub async fn send(
        &self,
        connection_id: &str,
        payload: Payload,
    ) -> Result<Delivered, DispatchError> {
        self.stats.total_sent.fetch_add(1, Ordering::Relaxed);

        let result = match timeout(
            self.send_timeout,
            self.transport.post_to_connection(connection_id, payload),
        )
        .await
        {
            Ok(Ok(())) => Ok(Delivered),
            Ok(Err(e)) => Err(DispatchError::from(e)),
            Err(_) => Err(DispatchError::TransientFailure(format!(
                "send timed out after {}ms",
                self.send_timeout.as_millis()
            ))),
        };

        match &result {
            Ok(_) => {
                self.stats.total_delivered.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_delivered();
            }
            Err(DispatchError::Gone) => {
                self.stats.total_gone.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_gone();
                tracing::debug!(connection_id = %connection_id, "Connection gone");
            }
            Err(DispatchError::TransientFailure(detail)) => {
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                DeliveryMetrics::record_failed();
                tracing::warn!(connection_id = %connection_id, error = %detail, "Delivery failed");
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LocalTransport;
    use async_trait::async_trait;

    struct StallingTransport;

    #[async_trait]
    impl Transport for StallingTransport {
        fn name(&self) -> &'static str {
            "stalling"
        }

        async fn post_to_connection(&self, _: &str, _: Payload) -> Result<(), TransportError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    fn dispatcher(transport: Arc<dyn Transport>) -> Dispatcher {
        Dispatcher::new(transport, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_send_delivered() {
        let local = Arc::new(LocalTransport::new(4));
        let mut rx = local.attach("c1");
        let dispatcher = dispatcher(local);

        let result = dispatcher.send("c1", Payload::from("hello")).await;
        assert_eq!(result, Ok(Delivered));
        assert_eq!(&*rx.recv().await.unwrap(), "hello");
        assert_eq!(dispatcher.stats().total_delivered, 1);
    }

    #[tokio::test]
    async fn test_send_gone() {
        let dispatcher = dispatcher(Arc::new(LocalTransport::new(4)));

        let result = dispatcher.send("missing", Payload::from("hello")).await;
        assert_eq!(result, Err(DispatchError::Gone));
        assert_eq!(dispatcher.stats().total_gone, 1);
    }

    #[tokio::test]
    async fn test_throttled_is_transient() {
        let local = Arc::new(LocalTransport::new(1));
        let _rx = local.attach("c1");
        let dispatcher = dispatcher(local);

        dispatcher.send("c1", Payload::from("one")).await.unwrap();
        let result = dispatcher.send("c1", Payload::from("two")).await;
        assert!(matches!(result, Err(DispatchError::TransientFailure(_))));

        let stats = dispatcher.stats();
        assert_eq!(stats.total_sent, 2);
        assert_eq!(stats.total_failed, 1);
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let dispatcher = dispatcher(Arc::new(StallingTransport));
        let result = dispatcher.send("c1", Payload::from("hello")).await;
        assert!(matches!(result, Err(DispatchError::TransientFailure(_))));
    }

    #[test]
    fn test_transport_error_classification() {
        assert_eq!(DispatchError::from(TransportError::Gone), DispatchError::Gone);
        assert!(matches!(
            DispatchError::from(TransportError::Throttled),
            DispatchError::TransientFailure(_)
        ));
        assert!(matches!(
            DispatchError::from(TransportError::Rejected("too big".into())),
            DispatchError::TransientFailure(_)
        ));
    }
}
