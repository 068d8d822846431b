//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed requests by method, status
//! - `relay_request_duration_seconds` (histogram): time to response headers
//! - `relay_upstream_errors_total` (counter): transport failures
//! - `relay_stream_chunks_total` (counter): streamed pieces relayed
//! - `relay_record_failures_total` (counter): traffic sink write failures
//! - `relay_in_flight` (gauge): relays not yet finished
//!
//! Without an installed exporter every call is a cheap no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Serve a Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!("relay_requests_total", "method" => method.clone(), "status" => status.clone())
        .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "method" => method, "status" => status)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error() {
    metrics::counter!("relay_upstream_errors_total").increment(1);
}

pub fn record_stream_chunk(len: usize) {
    metrics::counter!("relay_stream_chunks_total").increment(1);
    metrics::counter!("relay_stream_bytes_total").increment(len as u64);
}

pub fn record_sink_failure(sink: &str) {
    metrics::counter!("relay_record_failures_total", "sink" => sink.to_string()).increment(1);
}

pub fn set_in_flight(count: u64) {
    metrics::gauge!("relay_in_flight").set(count as f64);
}
