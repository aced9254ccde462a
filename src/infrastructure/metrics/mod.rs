//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Active WebSocket connection gauges (by lifecycle state)
//! - Dispatched event counts by opcode
//! - Heartbeat eviction counts

use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Active WebSocket connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active WebSocket connections",
        )
        .namespace("chat_gateway"),
        &["state"], // "connected", "identified"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Dispatched events counter - one increment per delivery attempt
pub static EVENTS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "events_dispatched_total",
            "Total outbound event delivery attempts",
        )
        .namespace("chat_gateway"),
        &["op"],
    )
    .expect("Failed to create EVENTS_DISPATCHED_TOTAL metric")
});

/// Connections evicted by the heartbeat monitor
pub static HEARTBEAT_EVICTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "heartbeat_evictions_total",
            "Connections closed for missing heartbeats",
        )
        .namespace("chat_gateway"),
    )
    .expect("Failed to create HEARTBEAT_EVICTIONS_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(EVENTS_DISPATCHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_DISPATCHED_TOTAL");
    registry
        .register(Box::new(HEARTBEAT_EVICTIONS_TOTAL.clone()))
        .expect("Failed to register HEARTBEAT_EVICTIONS_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to adjust the connection gauge for one lifecycle state
pub fn connection_opened(state: &str) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&[state])
        .inc();
}

pub fn connection_closed(state: &str) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&[state])
        .dec();
}

/// Helper to record a batch of delivery attempts for one opcode
pub fn record_dispatch(op: u8, attempts: u64) {
    EVENTS_DISPATCHED_TOTAL
        .with_label_values(&[&op.to_string()])
        .inc_by(attempts);
}
