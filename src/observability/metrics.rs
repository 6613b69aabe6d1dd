//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by route, status
//! - `router_unmatched_requests_total` (counter): requests no route accepted
//! - `router_request_duration_seconds` (histogram): latency by route
//! - `router_routes` (gauge): size of the active route table
//!
//! Paths are never used as labels; only configured route names are.

use std::net::SocketAddr;
use std::time::Instant;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a request that matched a route.
pub fn record_request(route: &str, status: u16, start: Instant) {
    ::metrics::counter!(
        "router_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("router_request_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

/// Record a request that no route accepted.
pub fn record_unmatched() {
    ::metrics::counter!("router_unmatched_requests_total").increment(1);
}

/// Publish the size of the route table currently serving traffic.
pub fn record_route_count(count: usize) {
    ::metrics::gauge!("router_routes").set(count as f64);
}
