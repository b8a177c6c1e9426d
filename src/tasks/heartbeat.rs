use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::broadcast::Broadcaster;
use crate::config::HeartbeatConfig;
use crate::websocket::ServerMessage;

/// Background task that fans a heartbeat frame out to every registered
/// connection, so connections that went away without a disconnect event
/// are pruned even when nobody else broadcasts.
pub struct HeartbeatTask {
    config: HeartbeatConfig,
    broadcaster: Arc<Broadcaster>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: HeartbeatConfig,
        broadcaster: Arc<Broadcaster>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            broadcaster,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let interval_secs = self.config.interval_secs.max(1);
        let mut heartbeat_timer = tokio::time::interval(Duration::from_secs(interval_secs));

        // Skip immediate first tick
        heartbeat_timer.tick().await;

        tracing::info!(heartbeat_interval_secs = interval_secs, "Heartbeat task started");

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = heartbeat_timer.tick() => {
                    self.send_heartbeats(interval_secs).await;
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    async fn send_heartbeats(&self, interval_secs: u64) {
        let payload = match ServerMessage::Heartbeat.to_payload() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize heartbeat");
                return;
            }
        };

        let start = Instant::now();
        let report = match self.broadcaster.broadcast(payload).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "Heartbeat round skipped, store unavailable");
                return;
            }
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            delivered = report.delivered,
            gone = report.gone,
            failed = report.failed,
            elapsed_ms = elapsed_ms,
            "Heartbeat round completed"
        );

        if elapsed_ms > interval_secs * 1000 / 2 {
            tracing::warn!(
                elapsed_ms = elapsed_ms,
                heartbeat_interval_ms = interval_secs * 1000,
                connections = report.attempted(),
                "Heartbeat round took more than 50% of interval"
            );
        }
    }
}
