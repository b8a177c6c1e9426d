//! Prometheus metrics for the relay.
//!
//! - Registry churn (registered / unregistered)
//! - Per-connection delivery outcomes (delivered / gone / failed)
//! - Broadcast fanout sizes
//! - Inbound events by kind and outcome
//! - Gauges refreshed on scrape (registered connections, attached sockets, store circuit)
//!
//! Metrics are observability only; nothing reads them back for correctness.

mod helpers;

pub use helpers::{
    encode_metrics, BroadcastMetrics, DeliveryMetrics, InboundMetrics, RegistryMetrics,
};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "relay";

lazy_static! {
    // Registry

    pub static ref CONNECTIONS_REGISTERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_connections_registered_total", METRIC_PREFIX),
        "Total register operations"
    ).unwrap();

    pub static ref CONNECTIONS_UNREGISTERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_connections_unregistered_total", METRIC_PREFIX),
        "Total unregister operations (explicit and self-healing)"
    ).unwrap();

    /// Refreshed from the store on scrape
    pub static ref CONNECTIONS_REGISTERED: IntGauge = register_int_gauge!(
        format!("{}_connections_registered", METRIC_PREFIX),
        "Connections currently present in the registry"
    ).unwrap();

    /// Refreshed from the local socket table on scrape
    pub static ref SOCKETS_ATTACHED: IntGauge = register_int_gauge!(
        format!("{}_sockets_attached", METRIC_PREFIX),
        "WebSocket connections terminated by this process"
    ).unwrap();

    /// 0 = closed, 1 = open, 2 = half-open
    pub static ref STORE_CIRCUIT_STATE: IntGauge = register_int_gauge!(
        format!("{}_store_circuit_state", METRIC_PREFIX),
        "Redis store circuit breaker state"
    ).unwrap();

    // Delivery

    pub static ref DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_deliveries_total", METRIC_PREFIX),
        "Per-connection delivery attempts by outcome",
        &["outcome"]
    ).unwrap();

    // Broadcast

    pub static ref BROADCASTS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_broadcasts_total", METRIC_PREFIX),
        "Completed broadcasts"
    ).unwrap();

    pub static ref BROADCAST_RECIPIENTS: Histogram = register_histogram!(
        format!("{}_broadcast_recipients", METRIC_PREFIX),
        "Connections attempted per broadcast",
        vec![0.0, 1.0, 10.0, 100.0, 1000.0, 10000.0]
    ).unwrap();

    // Inbound events

    pub static ref INBOUND_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_inbound_events_total", METRIC_PREFIX),
        "Inbound events by kind and status",
        &["kind", "status"]
    ).unwrap();
}
