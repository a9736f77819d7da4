//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts and latency
//! - Active gateway connections (connected / authenticated)
//! - Handshake rejections by reason
//! - Gateway commands by name and outcome, with latency
//! - Events published and handler failures by topic

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

const NAMESPACE: &str = "realtime_hub";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Active gateway connections gauge
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of active gateway connections",
        )
        .namespace(NAMESPACE),
        &["state"], // "connected", "authenticated"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Refused handshakes
pub static HANDSHAKE_REJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("handshake_rejections_total", "Refused gateway handshakes").namespace(NAMESPACE),
        &["reason"],
    )
    .expect("Failed to create HANDSHAKE_REJECTIONS_TOTAL metric")
});

/// Gateway commands handled
pub static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("commands_total", "Gateway commands handled").namespace(NAMESPACE),
        &["command", "outcome"], // outcome: "ok", "error"
    )
    .expect("Failed to create COMMANDS_TOTAL metric")
});

/// Gateway command latency
pub static COMMAND_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];
    HistogramVec::new(
        HistogramOpts::new(
            "command_duration_seconds",
            "Gateway command latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["command"],
    )
    .expect("Failed to create COMMAND_DURATION_SECONDS metric")
});

/// Events published on the bus
pub static EVENTS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("events_published_total", "Events published on the bus").namespace(NAMESPACE),
        &["topic"],
    )
    .expect("Failed to create EVENTS_PUBLISHED_TOTAL metric")
});

/// Event handlers that returned an error or panicked
pub static EVENT_HANDLER_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "event_handler_failures_total",
            "Event handlers that failed or panicked",
        )
        .namespace(NAMESPACE),
        &["topic"],
    )
    .expect("Failed to create EVENT_HANDLER_FAILURES_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(HANDSHAKE_REJECTIONS_TOTAL.clone()))
        .expect("Failed to register HANDSHAKE_REJECTIONS_TOTAL");
    registry
        .register(Box::new(COMMANDS_TOTAL.clone()))
        .expect("Failed to register COMMANDS_TOTAL");
    registry
        .register(Box::new(COMMAND_DURATION_SECONDS.clone()))
        .expect("Failed to register COMMAND_DURATION_SECONDS");
    registry
        .register(Box::new(EVENTS_PUBLISHED_TOTAL.clone()))
        .expect("Failed to register EVENTS_PUBLISHED_TOTAL");
    registry
        .register(Box::new(EVENT_HANDLER_FAILURES_TOTAL.clone()))
        .expect("Failed to register EVENT_HANDLER_FAILURES_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to update gateway connection counts
pub fn set_websocket_connections(connected: usize, authenticated: usize) {
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .set(connected as f64);
    WEBSOCKET_CONNECTIONS_ACTIVE
        .with_label_values(&["authenticated"])
        .set(authenticated as f64);
}

pub fn record_handshake_rejection(reason: &str) {
    HANDSHAKE_REJECTIONS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_command(command: &str, success: bool, duration_secs: f64) {
    let outcome = if success { "ok" } else { "error" };
    COMMANDS_TOTAL.with_label_values(&[command, outcome]).inc();
    COMMAND_DURATION_SECONDS
        .with_label_values(&[command])
        .observe(duration_secs);
}

pub fn record_event_published(topic: &str) {
    EVENTS_PUBLISHED_TOTAL.with_label_values(&[topic]).inc();
}

pub fn record_handler_failure(topic: &str) {
    EVENT_HANDLER_FAILURES_TOTAL.with_label_values(&[topic]).inc();
}
