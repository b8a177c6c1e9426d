//! Small recording helpers so call sites don't touch label strings

use prometheus::{Encoder, TextEncoder};

use crate::broadcast::BroadcastReport;

use super::{
    BROADCASTS_TOTAL, BROADCAST_RECIPIENTS, CONNECTIONS_REGISTERED_TOTAL,
    CONNECTIONS_UNREGISTERED_TOTAL, DELIVERIES_TOTAL, INBOUND_EVENTS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

pub struct RegistryMetrics;

impl RegistryMetrics {
    pub fn record_registered() {
        CONNECTIONS_REGISTERED_TOTAL.inc();
    }

    pub fn record_unregistered() {
        CONNECTIONS_UNREGISTERED_TOTAL.inc();
    }
}

pub struct DeliveryMetrics;

impl DeliveryMetrics {
    pub fn record_delivered() {
        DELIVERIES_TOTAL.with_label_values(&["delivered"]).inc();
    }

    pub fn record_gone() {
        DELIVERIES_TOTAL.with_label_values(&["gone"]).inc();
    }

    pub fn record_failed() {
        DELIVERIES_TOTAL.with_label_values(&["failed"]).inc();
    }
}

pub struct BroadcastMetrics;

impl BroadcastMetrics {
    pub fn record_broadcast(report: &BroadcastReport) {
        BROADCASTS_TOTAL.inc();
        BROADCAST_RECIPIENTS.observe(report.attempted() as f64);
    }
}

pub struct InboundMetrics;

impl InboundMetrics {
    pub fn record(kind: &str, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        INBOUND_EVENTS_TOTAL.with_label_values(&[kind, status]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_recorded_metrics() {
        RegistryMetrics::record_registered();
        DeliveryMetrics::record_gone();
        InboundMetrics::record("connect", true);

        let output = encode_metrics().unwrap();
        assert!(output.contains("relay_connections_registered_total"));
        assert!(output.contains("relay_deliveries_total{outcome=\"gone\"}"));
        assert!(output.contains("relay_inbound_events_total"));
    }
}
